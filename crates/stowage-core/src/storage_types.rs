use chrono::{DateTime, Datelike, Utc};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// Defined in core because configuration selects the backend before any
/// storage crate is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Time-based subdirectory layout for stored files
///
/// Each variant maps a point in time to a relative directory path ending in
/// `/`, or to the empty string for [`ShardFormat::None`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardFormat {
    #[default]
    None,
    Yearly,
    Monthly,
    Daily,
}

impl ShardFormat {
    /// Relative shard path for `at`, e.g. `2025/`, `2025/01/` or `2025/01/15/`.
    pub fn path_for(&self, at: DateTime<Utc>) -> String {
        match self {
            ShardFormat::None => String::new(),
            ShardFormat::Yearly => format!("{:04}/", at.year()),
            ShardFormat::Monthly => format!("{:04}/{:02}/", at.year(), at.month()),
            ShardFormat::Daily => {
                format!("{:04}/{:02}/{:02}/", at.year(), at.month(), at.day())
            }
        }
    }
}

impl FromStr for ShardFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(ShardFormat::None),
            "yearly" | "year" => Ok(ShardFormat::Yearly),
            "monthly" | "month" => Ok(ShardFormat::Monthly),
            "daily" | "day" => Ok(ShardFormat::Daily),
            _ => Err(anyhow::anyhow!("Invalid shard format: {}", s)),
        }
    }
}

impl Display for ShardFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ShardFormat::None => write!(f, "none"),
            ShardFormat::Yearly => write!(f, "yearly"),
            ShardFormat::Monthly => write!(f, "monthly"),
            ShardFormat::Daily => write!(f, "daily"),
        }
    }
}
