//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::pin::Pin;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Byte stream handed to and returned by storage backends
pub type StorageReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Storage abstraction trait
///
/// `save` is the one mandatory capability. `delete` is optional: backends that
/// cannot remove content keep the default, which returns
/// [`StorageError::Unsupported`], and report `false` from `supports_delete`.
///
/// **Names and locators:** `save` returns a locator of the form
/// `{base_url}{shard}{filename}` joined with `/`. Read operations take the
/// *name*, which is the locator without the base URL. `delete` accepts either.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `reader` under a collision-free name derived from `filename`
    /// and return its locator.
    ///
    /// `ext` is the normalized extension of `filename` (lower-case with the
    /// leading dot), or empty when the file has none.
    async fn save(
        &self,
        reader: StorageReader,
        filename: &str,
        ext: &str,
    ) -> StorageResult<String>;

    /// Open a stored file by name for reading
    async fn open(&self, name: &str) -> StorageResult<StorageReader>;

    /// Read a stored file into memory
    async fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        let mut reader = self.open(name).await?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        Ok(data)
    }

    /// Check if a file exists
    async fn exists(&self, name: &str) -> StorageResult<bool>;

    /// Delete a file by the locator `save` returned
    async fn delete(&self, _locator: &str) -> StorageResult<()> {
        Err(StorageError::Unsupported("delete"))
    }

    /// Whether `delete` is implemented by this backend
    fn supports_delete(&self) -> bool {
        false
    }

    /// Base URL prefixed to every locator (empty when locators are relative)
    fn base_url(&self) -> &str;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
