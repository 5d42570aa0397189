use std::collections::BTreeSet;

use stowage_core::Config;

/// Lower-case `ext` and give it a leading dot; the empty extension stays empty.
pub fn normalize_ext(ext: &str) -> String {
    let trimmed = ext.trim();
    if trimmed.is_empty() || trimmed == "." {
        return String::new();
    }
    let lower = trimmed.to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

/// Normalized extension of a client filename.
///
/// Only the base name is considered, so `dir.v2/readme` has no extension.
pub fn extension_of(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match base.rfind('.') {
        Some(idx) => normalize_ext(&base[idx..]),
        None => String::new(),
    }
}

/// Size and extension rules applied to each uploaded file
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    max_size: u64,
    allowed_extensions: BTreeSet<String>,
}

impl UploadPolicy {
    pub fn new<I, S>(max_size: u64, allowed_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_extensions = allowed_extensions
            .into_iter()
            .map(|ext| normalize_ext(ext.as_ref()))
            .filter(|ext| !ext.is_empty())
            .collect();

        Self {
            max_size,
            allowed_extensions,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_file_size_bytes, &config.allowed_extensions)
    }

    /// Whether `ext` (with or without its dot, any case) is on the allow-list
    pub fn is_allowed_ext(&self, ext: &str) -> bool {
        let ext = normalize_ext(ext);
        !ext.is_empty() && self.allowed_extensions.contains(&ext)
    }

    /// Zero-byte files are never accepted; `max_size` itself is.
    pub fn is_allowed_size(&self, size: u64) -> bool {
        size > 0 && size <= self.max_size
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn allowed_extensions(&self) -> impl Iterator<Item = &str> {
        self.allowed_extensions.iter().map(String::as_str)
    }
}
