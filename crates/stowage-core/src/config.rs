//! Configuration module
//!
//! Settings for the upload service: server, storage backend, upload policy and
//! the optional watermark. Values come from the environment (and `.env`).

use std::env;

use crate::storage_types::{ShardFormat, StorageBackend};

const SERVER_PORT: u16 = 3000;
const MAX_FILE_SIZE_MB: u64 = 10;
const MAX_REQUEST_SIZE_MB: u64 = 32;
const WATERMARK_PADDING: u32 = 10;
const DEFAULT_FIELD_NAME: &str = "files";
const DEFAULT_STORAGE_PATH: &str = "./uploads";
const DEFAULT_EXTENSIONS: &str = ".jpg,.jpeg,.png,.gif,.txt";
const DEFAULT_WATERMARK_POSITION: &str = "bottom-right";
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;

/// Watermark settings; the position string is parsed by the processing crate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatermarkSettings {
    pub path: String,
    pub padding: u32,
    pub position: String,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    pub shard_format: ShardFormat,
    // Upload configuration
    pub upload_field_name: String,
    pub max_file_size_bytes: u64,
    pub max_request_size_bytes: u64,
    pub allowed_extensions: Vec<String>,
    pub watermark: Option<WatermarkSettings>,
    // HTTP configuration
    pub cors_origins: Vec<String>,
    pub http_concurrency_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            environment: "development".to_string(),
            storage_backend: StorageBackend::Local,
            local_storage_path: DEFAULT_STORAGE_PATH.to_string(),
            local_storage_base_url: String::new(),
            shard_format: ShardFormat::None,
            upload_field_name: DEFAULT_FIELD_NAME.to_string(),
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            max_request_size_bytes: MAX_REQUEST_SIZE_MB * 1024 * 1024,
            allowed_extensions: split_list(DEFAULT_EXTENSIONS),
            watermark: None,
            cors_origins: vec!["*".to_string()],
            http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => StorageBackend::Local,
        };

        let shard_format = match env::var("STORAGE_SHARD_FORMAT") {
            Ok(raw) => raw.parse()?,
            Err(_) => ShardFormat::None,
        };

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        let max_request_size_mb = env::var("MAX_REQUEST_SIZE_MB")
            .unwrap_or_else(|_| MAX_REQUEST_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(MAX_REQUEST_SIZE_MB);

        let allowed_extensions = split_list(
            &env::var("ALLOWED_EXTENSIONS").unwrap_or_else(|_| DEFAULT_EXTENSIONS.to_string()),
        );

        let watermark = env::var("WATERMARK_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(|path| WatermarkSettings {
                path,
                padding: env::var("WATERMARK_PADDING")
                    .unwrap_or_else(|_| WATERMARK_PADDING.to_string())
                    .parse()
                    .unwrap_or(WATERMARK_PADDING),
                position: env::var("WATERMARK_POSITION")
                    .unwrap_or_else(|_| DEFAULT_WATERMARK_POSITION.to_string())
                    .to_lowercase(),
            });

        let config = Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .unwrap_or(SERVER_PORT),
            environment,
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| DEFAULT_STORAGE_PATH.to_string()),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").unwrap_or_default(),
            shard_format,
            upload_field_name: env::var("UPLOAD_FIELD_NAME")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_FIELD_NAME.to_string()),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            max_request_size_bytes: max_request_size_mb * 1024 * 1024,
            allowed_extensions,
            watermark,
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(HTTP_CONCURRENCY_LIMIT)
                .max(1),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than zero"));
        }

        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_EXTENSIONS must list at least one extension"
            ));
        }

        if self.max_request_size_bytes < self.max_file_size_bytes {
            return Err(anyhow::anyhow!(
                "MAX_REQUEST_SIZE_MB must not be smaller than MAX_FILE_SIZE_MB"
            ));
        }

        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_empty() {
            return Err(anyhow::anyhow!(
                "LOCAL_STORAGE_PATH must be set when using local storage backend"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.upload_field_name, "files");
        assert_eq!(config.max_request_size_bytes, 32 * 1024 * 1024);
        assert!(config.allowed_extensions.contains(&".png".to_string()));
    }

    #[test]
    fn test_validate_rejects_empty_extensions() {
        let config = Config {
            allowed_extensions: Vec::new(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_small_request_limit() {
        let config = Config {
            max_request_size_bytes: 1024,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_split_list_normalizes() {
        assert_eq!(split_list(" .PNG, gif ,,"), vec![".png", "gif"]);
    }

    #[test]
    fn test_is_production() {
        let config = Config {
            environment: "Prod".to_string(),
            ..Config::default()
        };
        assert!(config.is_production());
        assert!(!Config::default().is_production());
    }
}
