//! Stowage Storage Library
//!
//! This crate provides the storage abstraction and its backends: the local
//! filesystem and an in-memory map.
//!
//! # Naming
//!
//! Every backend stores a file as `{shard}{filename}`, where the shard is the
//! time-based directory chosen by [`ShardFormat`] (for example `2025/01/15/`)
//! and the filename is the sanitized client name made unique by a
//! [`FilenamePolicy`]. `save` returns that name prefixed with the backend's
//! base URL.

pub mod clock;
pub mod factory;
pub mod filename;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use clock::{Clock, SystemClock};
pub use factory::create_storage;
pub use filename::{unique_filename, DirectoryView, FilenamePolicy, LocalDirectory, SuffixFilename};
pub use keys::sanitize_filename;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStorage;
pub use stowage_core::{ShardFormat, StorageBackend};
pub use traits::{Storage, StorageError, StorageReader, StorageResult};
