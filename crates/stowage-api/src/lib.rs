//! Stowage API Library
//!
//! HTTP adapter over the upload orchestrator: multipart decoding, the
//! upload/serve/delete routes and application setup.

mod api_doc;
mod handlers;
mod multipart;

pub mod error;
pub mod setup;
pub mod state;
pub mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError, UploadErrorResponse};
pub use state::AppState;
