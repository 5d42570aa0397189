//! Upload orchestration and its input types

pub mod error;
pub mod service;
pub mod types;

pub use error::{UploadError, UploadFailure};
pub use service::Upload;
pub use types::{FileContent, UploadForm, UploadedFile};
