//! Stowage Processing Library
//!
//! Everything between a parsed multipart form and a storage backend:
//! upload validation, the image format registry, watermark compositing and
//! the [`Upload`] orchestrator.

pub mod image;
pub mod upload;
pub mod validator;

pub use self::image::{Watermark, WatermarkError, WatermarkPosition};
pub use upload::{FileContent, Upload, UploadError, UploadFailure, UploadForm, UploadedFile};
pub use validator::{extension_of, normalize_ext, UploadPolicy};
