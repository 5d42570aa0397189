use crate::clock::{Clock, SystemClock};
use crate::filename::{DirectoryView, FilenamePolicy, SuffixFilename};
use crate::keys;
use crate::traits::{Storage, StorageError, StorageReader, StorageResult};
use crate::{ShardFormat, StorageBackend};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

/// In-process storage backed by a map of name to content
///
/// Mirrors [`LocalStorage`](crate::LocalStorage) naming exactly, which makes it
/// useful for tests and for ephemeral deployments.
#[derive(Clone)]
pub struct MemoryStorage {
    files: Arc<RwLock<BTreeMap<String, Bytes>>>,
    base_url: String,
    shard_format: ShardFormat,
    filenames: Arc<dyn FilenamePolicy>,
    clock: Arc<dyn Clock>,
}

/// Entries of one shard directory inside the map
struct ShardView<'a> {
    files: &'a BTreeMap<String, Bytes>,
    shard: &'a str,
}

impl DirectoryView for ShardView<'_> {
    fn contains(&self, name: &str) -> bool {
        self.files.contains_key(&format!("{}{}", self.shard, name))
    }
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>, shard_format: ShardFormat) -> Self {
        Self {
            files: Arc::new(RwLock::new(BTreeMap::new())),
            base_url: keys::normalize_base_url(&base_url.into()),
            shard_format,
            filenames: Arc::new(SuffixFilename),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_filename_policy(mut self, policy: impl FilenamePolicy + 'static) -> Self {
        self.filenames = Arc::new(policy);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Number of stored files
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.files.read().await.is_empty()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save(
        &self,
        mut reader: StorageReader,
        filename: &str,
        ext: &str,
    ) -> StorageResult<String> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to read upload stream: {}", e))
        })?;

        let shard = self.shard_format.path_for(self.clock.now());
        let candidate = keys::sanitize_filename(filename, ext);

        let mut files = self.files.write().await;
        let allocated = self.filenames.allocate(
            &ShardView {
                files: &files,
                shard: &shard,
            },
            &candidate,
            ext,
        );
        keys::validate_segment(&allocated)?;

        let name = format!("{}{}", shard, allocated);
        if files.contains_key(&name) {
            return Err(StorageError::UploadFailed(format!(
                "Filename policy returned an existing name: {}",
                name
            )));
        }

        let size = data.len();
        files.insert(name.clone(), Bytes::from(data));
        drop(files);

        tracing::debug!(key = %name, size_bytes = size, "Memory storage save successful");

        Ok(keys::build_locator(&self.base_url, &name))
    }

    async fn open(&self, name: &str) -> StorageResult<StorageReader> {
        keys::validate_name(name)?;
        let files = self.files.read().await;
        let data = files
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        Ok(Box::pin(Cursor::new(data)))
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        keys::validate_name(name)?;
        Ok(self.files.read().await.contains_key(name))
    }

    async fn delete(&self, locator: &str) -> StorageResult<()> {
        let name = keys::strip_base_url(locator, &self.base_url);
        keys::validate_name(name)?;
        match self.files.write().await.remove(name) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(name.to_string())),
        }
    }

    fn supports_delete(&self) -> bool {
        true
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
