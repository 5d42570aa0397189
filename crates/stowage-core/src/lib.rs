//! Stowage Core Library
//!
//! This crate provides configuration, the application error type and the
//! storage enums shared by all Stowage components.

pub mod config;
pub mod error;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, WatermarkSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::{ShardFormat, StorageBackend};
