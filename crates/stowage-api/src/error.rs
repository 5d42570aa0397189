//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Domain errors
//! (`StorageError`, `UploadError`, `WatermarkError`) convert into `AppError`
//! through the `From` impls below and render as an [`ErrorResponse`].

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use stowage_core::{AppError, ErrorMetadata, LogLevel};
use stowage_processing::{UploadError, UploadFailure, WatermarkError};
use stowage_storage::StorageError;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

/// Error body of a failed upload batch
///
/// `files` lists the locators stored before the failing file.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadErrorResponse {
    #[serde(flatten)]
    pub error: ErrorResponse,
    pub files: Vec<String>,
}

/// Wrapper type for AppError to implement IntoResponse
///
/// Needed because of the orphan rule: `IntoResponse` and `AppError` are both
/// foreign to this crate.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl HttpAppError {
    /// Status and body for this error; logs it at the error's level
    pub fn render(&self) -> (StatusCode, ErrorResponse) {
        let app_error = &self.0;
        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // Details are hidden in production and for sensitive errors.
        let show_details = !is_production_env() && !app_error.is_sensitive();

        let body = ErrorResponse {
            error: app_error.client_message(),
            details: show_details.then(|| app_error.detailed_message()),
            error_type: show_details.then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        };

        (status, body)
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let (status, body) = self.render();
        (status, Json(body)).into_response()
    }
}

/// A failed upload batch rendered with the locators it did store
#[derive(Debug)]
pub struct UploadRejection {
    pub saved: Vec<String>,
    pub error: HttpAppError,
}

impl From<UploadFailure> for UploadRejection {
    fn from(failure: UploadFailure) -> Self {
        Self {
            saved: failure.saved,
            error: failure.error.into(),
        }
    }
}

impl From<HttpAppError> for UploadRejection {
    fn from(error: HttpAppError) -> Self {
        Self {
            saved: Vec::new(),
            error,
        }
    }
}

impl IntoResponse for UploadRejection {
    fn into_response(self) -> Response {
        let (status, error) = self.error.render();
        let body = UploadErrorResponse {
            error,
            files: self.saved,
        };
        (status, Json(body)).into_response()
    }
}

// Convert domain errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        let app = match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::UploadFailed(msg) => AppError::Storage(msg),
            StorageError::DeleteFailed(msg) => AppError::Storage(msg),
            StorageError::BackendError(msg) => AppError::Storage(msg),
            StorageError::Unsupported(op) => {
                AppError::Storage(format!("Operation not supported by backend: {}", op))
            }
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::IoError(err) => AppError::Internal(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => AppError::Internal(msg),
        };
        HttpAppError(app)
    }
}

impl From<WatermarkError> for HttpAppError {
    fn from(err: WatermarkError) -> Self {
        let app = match err {
            WatermarkError::UnsupportedFormat(ext) => {
                AppError::UnsupportedMediaType(format!("Cannot watermark {:?} files", ext))
            }
            err @ WatermarkError::TooLarge { .. } => AppError::Unprocessable(err.to_string()),
            WatermarkError::Image(err) => {
                AppError::ImageProcessing(format!("Failed to decode or encode image: {}", err))
            }
            err @ WatermarkError::InvalidPosition(_) => AppError::Internal(err.to_string()),
            WatermarkError::Io(err) => AppError::Internal(format!("IO error: {}", err)),
        };
        HttpAppError(app)
    }
}

impl From<UploadError> for HttpAppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::NoUploadFile => {
                HttpAppError(AppError::InvalidInput("No upload file".to_string()))
            }
            UploadError::NotAllowSize { size: 0, .. } => {
                HttpAppError(AppError::InvalidInput("File is empty".to_string()))
            }
            UploadError::NotAllowSize { size, max } => HttpAppError(AppError::PayloadTooLarge(
                format!("{} bytes exceeds max {} bytes", size, max),
            )),
            UploadError::UnknownFileSize => {
                HttpAppError(AppError::InvalidInput("Unknown file size".to_string()))
            }
            UploadError::NotAllowExt(ext) => HttpAppError(AppError::InvalidInput(format!(
                "File extension not allowed: {:?}",
                ext
            ))),
            UploadError::Watermark(err) => err.into(),
            UploadError::Storage(err) => err.into(),
            UploadError::Io(err) => HttpAppError(AppError::Internal(format!("IO error: {}", err))),
            UploadError::Task(msg) => HttpAppError(AppError::Internal(msg)),
        }
    }
}

/// Multipart parse failures: oversized bodies are 413, everything else 400.
impl From<MultipartError> for HttpAppError {
    fn from(err: MultipartError) -> Self {
        let message = format!("Failed to read multipart: {}", err.body_text());
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            HttpAppError(AppError::PayloadTooLarge(message))
        } else {
            HttpAppError(AppError::InvalidInput(message))
        }
    }
}
