#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-memory")]
use crate::MemoryStorage;
use crate::{Storage, StorageBackend, StorageResult};
#[cfg(not(all(feature = "storage-local", feature = "storage-memory")))]
use crate::StorageError;
use std::sync::Arc;
use stowage_core::Config;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let storage = LocalStorage::new(
                &config.local_storage_path,
                config.local_storage_base_url.clone(),
                config.shard_format,
            )
            .await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new(
            config.local_storage_base_url.clone(),
            config.shard_format,
        ))),

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(StorageError::ConfigError(
            "Memory storage backend not available (storage-memory feature not enabled)"
                .to_string(),
        )),
    }
}

#[cfg(all(test, feature = "storage-local", feature = "storage-memory"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_local_storage() {
        let dir = tempdir().unwrap();
        let config = Config {
            local_storage_path: dir.path().join("uploads").display().to_string(),
            local_storage_base_url: "http://localhost:3000/files".to_string(),
            ..Config::default()
        };

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
        assert_eq!(storage.base_url(), "http://localhost:3000/files/");
        assert!(dir.path().join("uploads").is_dir());
    }

    #[tokio::test]
    async fn test_create_memory_storage() {
        let config = Config {
            storage_backend: StorageBackend::Memory,
            ..Config::default()
        };

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Memory);
        assert!(storage.supports_delete());
    }
}
