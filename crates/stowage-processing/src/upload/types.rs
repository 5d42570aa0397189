//! Input types for the upload orchestrator.

use bytes::Bytes;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use stowage_storage::StorageReader;

/// Where an uploaded file's bytes live
#[derive(Clone, Debug)]
pub enum FileContent {
    Memory(Bytes),
    Disk(PathBuf),
}

/// One file entry of a multipart form
#[derive(Clone, Debug)]
pub struct UploadedFile {
    /// Client-supplied filename
    pub filename: String,
    /// Declared size in bytes; `None` when the client did not declare one
    pub size: Option<u64>,
    pub content: FileContent,
}

impl UploadedFile {
    pub fn from_bytes(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            filename: filename.into(),
            size: Some(data.len() as u64),
            content: FileContent::Memory(data),
        }
    }

    /// A file already spooled to disk; its size is taken from the filesystem
    pub async fn from_path(
        filename: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> std::io::Result<Self> {
        let path = path.into();
        let size = tokio::fs::metadata(&path).await?.len();
        Ok(Self {
            filename: filename.into(),
            size: Some(size),
            content: FileContent::Disk(path),
        })
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    pub async fn open(&self) -> std::io::Result<StorageReader> {
        match &self.content {
            FileContent::Memory(data) => Ok(Box::pin(Cursor::new(data.clone()))),
            FileContent::Disk(path) => Ok(Box::pin(tokio::fs::File::open(path).await?)),
        }
    }

    pub async fn read_all(&self) -> std::io::Result<Vec<u8>> {
        match &self.content {
            FileContent::Memory(data) => Ok(data.to_vec()),
            FileContent::Disk(path) => tokio::fs::read(path).await,
        }
    }
}

/// Parsed multipart form: field name to files, in submission order
#[derive(Clone, Debug, Default)]
pub struct UploadForm {
    files: HashMap<String, Vec<UploadedFile>>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, file: UploadedFile) {
        self.files.entry(field.into()).or_default().push(file);
    }

    pub fn with_file(mut self, field: impl Into<String>, file: UploadedFile) -> Self {
        self.add(field, file);
        self
    }

    /// Files submitted under `field`; empty when there are none
    pub fn files(&self, field: &str) -> &[UploadedFile] {
        self.files.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.files.values().all(Vec::is_empty)
    }
}
