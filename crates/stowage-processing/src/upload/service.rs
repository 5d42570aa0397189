//! Upload orchestration: validate, watermark, store.
//!
//! Files of one field are handled strictly in order. The first failure ends the
//! batch; files stored before it are reported alongside the error and are not
//! rolled back.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use stowage_core::Config;
use stowage_storage::{Storage, StorageReader};

use super::error::{UploadError, UploadFailure};
use super::types::{UploadForm, UploadedFile};
use crate::image::{Watermark, WatermarkError, WatermarkPosition};
use crate::validator::{extension_of, UploadPolicy};

/// Validates uploaded files and hands them to a storage backend
#[derive(Clone)]
pub struct Upload {
    policy: UploadPolicy,
    storage: Arc<dyn Storage>,
    watermark: Option<Arc<Watermark>>,
}

impl Upload {
    /// # Arguments
    /// * `max_size` - Largest accepted file in bytes, inclusive
    /// * `allowed_extensions` - Accepted extensions, any case, dot optional
    /// * `storage` - Backend that receives accepted files
    pub fn new<I, S>(max_size: u64, allowed_extensions: I, storage: Arc<dyn Storage>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_policy(UploadPolicy::new(max_size, allowed_extensions), storage)
    }

    pub fn with_policy(policy: UploadPolicy, storage: Arc<dyn Storage>) -> Self {
        Self {
            policy,
            storage,
            watermark: None,
        }
    }

    /// Build from configuration, loading the configured watermark if any
    pub fn from_config(config: &Config, storage: Arc<dyn Storage>) -> Result<Self, WatermarkError> {
        let mut upload = Self::with_policy(UploadPolicy::from_config(config), storage);
        if let Some(settings) = &config.watermark {
            upload.set_watermark(Some(Arc::new(Watermark::from_settings(settings)?)));
        }
        Ok(upload)
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn watermark(&self) -> Option<&Arc<Watermark>> {
        self.watermark.as_ref()
    }

    pub fn set_storage(&mut self, storage: Arc<dyn Storage>) {
        self.storage = storage;
    }

    /// Install or clear (`None`) the watermark applied to eligible images
    pub fn set_watermark(&mut self, watermark: Option<Arc<Watermark>>) {
        self.watermark = watermark;
    }

    /// Load a watermark image from disk and install it
    pub fn set_watermark_file(
        &mut self,
        path: impl AsRef<Path>,
        padding: u32,
        position: WatermarkPosition,
    ) -> Result<(), WatermarkError> {
        let watermark = Watermark::open(path, padding, position)?;
        self.set_watermark(Some(Arc::new(watermark)));
        Ok(())
    }

    pub fn is_allowed_ext(&self, ext: &str) -> bool {
        self.policy.is_allowed_ext(ext)
    }

    pub fn is_allowed_size(&self, size: u64) -> bool {
        self.policy.is_allowed_size(size)
    }

    /// Store every file submitted under `field` and return their locators in order
    pub async fn process(&self, field: &str, form: &UploadForm) -> Result<Vec<String>, UploadFailure> {
        let files = form.files(field);
        if files.is_empty() {
            return Err(UploadError::NoUploadFile.into());
        }

        let start = Instant::now();
        let mut saved = Vec::with_capacity(files.len());

        for (index, file) in files.iter().enumerate() {
            match self.process_file(file).await {
                Ok(locator) => saved.push(locator),
                Err(error) => {
                    tracing::warn!(
                        field = %field,
                        index,
                        filename = %file.filename,
                        saved = saved.len(),
                        error = %error,
                        "Upload batch stopped"
                    );
                    return Err(UploadFailure::new(saved, error));
                }
            }
        }

        tracing::info!(
            field = %field,
            count = saved.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload batch stored"
        );

        Ok(saved)
    }

    async fn process_file(&self, file: &UploadedFile) -> Result<String, UploadError> {
        let size = file.size.ok_or(UploadError::UnknownFileSize)?;
        if !self.is_allowed_size(size) {
            return Err(UploadError::NotAllowSize {
                size,
                max: self.policy.max_size(),
            });
        }

        let ext = extension_of(&file.filename);
        if !self.is_allowed_ext(&ext) {
            return Err(UploadError::NotAllowExt(ext));
        }

        let reader: StorageReader = match &self.watermark {
            Some(watermark) if Watermark::is_allowed_ext(&ext) => {
                let marked = self.watermarked(file, Arc::clone(watermark), &ext).await?;
                Box::pin(Cursor::new(marked))
            }
            _ => file.open().await?,
        };

        let locator = self.storage.save(reader, &file.filename, &ext).await?;

        tracing::debug!(
            filename = %file.filename,
            key = %locator,
            size_bytes = size,
            "Stored uploaded file"
        );

        Ok(locator)
    }

    async fn watermarked(
        &self,
        file: &UploadedFile,
        watermark: Arc<Watermark>,
        ext: &str,
    ) -> Result<Vec<u8>, UploadError> {
        let data = file.read_all().await?;
        let ext = ext.to_string();

        let marked = tokio::task::spawn_blocking(move || {
            let mut buffer = Cursor::new(data);
            watermark.mark(&mut buffer, &ext)?;
            Ok::<_, WatermarkError>(buffer.into_inner())
        })
        .await
        .map_err(|e| UploadError::Task(e.to_string()))??;

        Ok(marked)
    }
}
