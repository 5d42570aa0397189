use stowage_storage::StorageError;
use thiserror::Error;

use crate::image::WatermarkError;

/// Why a single file was rejected or could not be stored
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No upload file")]
    NoUploadFile,

    #[error("File size not allowed: {size} bytes (max: {max} bytes)")]
    NotAllowSize { size: u64, max: u64 },

    #[error("Unknown file size")]
    UnknownFileSize,

    #[error("File extension not allowed: {0:?}")]
    NotAllowExt(String),

    #[error(transparent)]
    Watermark(#[from] WatermarkError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// A batch that stopped at its first failing file
///
/// `saved` holds the locators stored before the failure, in input order. They
/// stay stored.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct UploadFailure {
    pub saved: Vec<String>,
    #[source]
    pub error: UploadError,
}

impl UploadFailure {
    pub fn new(saved: Vec<String>, error: UploadError) -> Self {
        Self { saved, error }
    }
}

impl From<UploadError> for UploadFailure {
    fn from(error: UploadError) -> Self {
        Self::new(Vec::new(), error)
    }
}
