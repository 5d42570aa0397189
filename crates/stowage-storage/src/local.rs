use crate::clock::{Clock, SystemClock};
use crate::filename::{FilenamePolicy, LocalDirectory, SuffixFilename};
use crate::keys;
use crate::traits::{Storage, StorageError, StorageReader, StorageResult};
use crate::{ShardFormat, StorageBackend};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

/// Local filesystem storage implementation
///
/// Files land in `{base_path}/{shard}/{filename}` where the shard comes from
/// the configured [`ShardFormat`]. Clones share the creation lock, so a clone
/// is the same storage instance as far as filename allocation is concerned.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    shard_format: ShardFormat,
    filenames: Arc<dyn FilenamePolicy>,
    clock: Arc<dyn Clock>,
    create_lock: Arc<Mutex<()>>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage, created if missing
    /// * `base_url` - Prefix for returned locators (e.g. "http://localhost:3000/files"),
    ///   or empty for relative locators
    /// * `shard_format` - Time-based subdirectory layout
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: impl Into<String>,
        shard_format: ShardFormat,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let meta = fs::metadata(&base_path).await?;
        if !meta.is_dir() {
            return Err(StorageError::ConfigError(format!(
                "Storage path is not a directory: {}",
                base_path.display()
            )));
        }

        Ok(LocalStorage {
            base_path,
            base_url: keys::normalize_base_url(&base_url.into()),
            shard_format,
            filenames: Arc::new(SuffixFilename),
            clock: Arc::new(SystemClock),
            create_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Replace the filename allocation policy
    pub fn with_filename_policy(mut self, policy: impl FilenamePolicy + 'static) -> Self {
        self.filenames = Arc::new(policy);
        self
    }

    /// Replace the clock used to pick the shard directory
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn shard_format(&self) -> ShardFormat {
        self.shard_format
    }

    /// Convert a storage name to a filesystem path with security validation
    fn key_to_path(&self, name: &str) -> StorageResult<PathBuf> {
        keys::validate_name(name)?;

        let path = self.base_path.join(name);

        // Symlinks inside the root may still point elsewhere.
        if let Ok(canonical) = path.canonicalize() {
            let base_canonical = self.base_path.canonicalize().map_err(|e| {
                StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
            })?;
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage name resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Allocate a free name in `dir` and create the file.
    ///
    /// The lock spans allocation and creation only; the caller copies the body
    /// after it is released.
    async fn create_unique(
        &self,
        dir: &Path,
        candidate: &str,
        ext: &str,
    ) -> StorageResult<(String, fs::File)> {
        let _guard = self.create_lock.lock().await;

        let mut previous: Option<String> = None;
        loop {
            let policy = Arc::clone(&self.filenames);
            let dir_buf = dir.to_path_buf();
            let desired = candidate.to_string();
            let ext_owned = ext.to_string();
            let name = tokio::task::spawn_blocking(move || {
                policy.allocate(&LocalDirectory(&dir_buf), &desired, &ext_owned)
            })
            .await
            .map_err(|e| StorageError::BackendError(format!("Filename allocation failed: {}", e)))?;

            keys::validate_segment(&name)?;
            if previous.as_deref() == Some(name.as_str()) {
                return Err(StorageError::UploadFailed(format!(
                    "Filename policy keeps returning an existing name: {}",
                    name
                )));
            }

            let path = dir.join(&name);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((name, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(
                        path = %path.display(),
                        "File appeared between allocation and creation, allocating again"
                    );
                    previous = Some(name);
                }
                Err(e) => {
                    return Err(StorageError::UploadFailed(format!(
                        "Failed to create file {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn save(
        &self,
        mut reader: StorageReader,
        filename: &str,
        ext: &str,
    ) -> StorageResult<String> {
        let start = std::time::Instant::now();
        let shard = self.shard_format.path_for(self.clock.now());
        let dir = self.base_path.join(&shard);

        fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let candidate = keys::sanitize_filename(filename, ext);
        let (allocated, mut file) = self.create_unique(&dir, &candidate, ext).await?;
        let path = dir.join(&allocated);

        let bytes_copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write stream to file {}: {}",
                path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        let name = format!("{}{}", shard, allocated);
        let locator = keys::build_locator(&self.base_url, &name);

        tracing::info!(
            path = %path.display(),
            key = %name,
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage save successful"
        );

        Ok(locator)
    }

    async fn open(&self, name: &str) -> StorageResult<StorageReader> {
        let path = self.key_to_path(name)?;

        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(name.to_string())
            } else {
                StorageError::IoError(e)
            }
        })?;

        if file.metadata().await?.is_dir() {
            return Err(StorageError::NotFound(name.to_string()));
        }

        Ok(Box::pin(file))
    }

    async fn exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.key_to_path(name)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn delete(&self, locator: &str) -> StorageResult<()> {
        let name = keys::strip_base_url(locator, &self.base_url);
        let path = self.key_to_path(name)?;
        let start = std::time::Instant::now();

        fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::NotFound(name.to_string())
            } else {
                StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;

        tracing::info!(
            path = %path.display(),
            key = %name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn supports_delete(&self) -> bool {
        true
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use crate::filename::DirectoryView;
    use chrono::{DateTime, TimeZone, Utc};
    use std::io::Cursor;
    use std::sync::Mutex as StdMutex;
    use tempfile::tempdir;

    fn reader(data: &[u8]) -> StorageReader {
        Box::pin(Cursor::new(data.to_vec()))
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_local_storage_save_read() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:3000/files", ShardFormat::None)
            .await
            .unwrap();

        let data = b"test data";
        let locator = storage.save(reader(data), "test.txt", ".txt").await.unwrap();
        assert_eq!(locator, "http://localhost:3000/files/test.txt");

        let name = keys::strip_base_url(&locator, storage.base_url());
        assert_eq!(storage.read(name).await.unwrap(), data);
        assert!(storage.exists(name).await.unwrap());
    }

    #[tokio::test]
    async fn test_collisions_get_suffixes() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "", ShardFormat::None)
            .await
            .unwrap();

        let first = storage.save(reader(b"1"), "a.xml", ".xml").await.unwrap();
        let second = storage.save(reader(b"2"), "a.xml", ".xml").await.unwrap();
        let third = storage.save(reader(b"3"), "a.xml", ".xml").await.unwrap();

        assert_eq!(first, "a.xml");
        assert_eq!(second, "a_1.xml");
        assert_eq!(third, "a_2.xml");
        assert_eq!(storage.read("a_1.xml").await.unwrap(), b"2");
    }

    #[tokio::test]
    async fn test_long_names_keep_extension_across_collisions() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "", ShardFormat::None)
            .await
            .unwrap();

        for stem in ["a".repeat(300), "é".repeat(200)] {
            let filename = format!("{}.txt", stem);
            let first = storage.save(reader(b"1"), &filename, ".txt").await.unwrap();
            let second = storage.save(reader(b"2"), &filename, ".txt").await.unwrap();

            assert_ne!(first, second);
            for name in [&first, &second] {
                assert!(name.ends_with(".txt"), "{} lost its extension", name);
                assert!(name.len() <= 255);
            }
            assert!(second.ends_with("_1.txt"));
            assert_eq!(storage.read(&second).await.unwrap(), b"2");
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exists_surfaces_io_errors() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "", ShardFormat::None)
            .await
            .unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores directory permissions.
        let denied = std::fs::metadata(locked.join("a.txt"))
            .err()
            .is_some_and(|e| e.kind() == ErrorKind::PermissionDenied);
        let result = storage.exists("locked/a.txt").await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if denied {
            assert!(matches!(result, Err(StorageError::IoError(_))));
        } else {
            assert!(!result.unwrap());
        }
    }

    #[tokio::test]
    async fn test_daily_shards() {
        let dir = tempdir().unwrap();
        let now = Arc::new(StdMutex::new(day(15)));
        let clock_now = Arc::clone(&now);
        let storage = LocalStorage::new(dir.path(), "", ShardFormat::Daily)
            .await
            .unwrap()
            .with_clock(move || *clock_now.lock().unwrap());

        let first = storage.save(reader(b"a"), "report.xml", ".xml").await.unwrap();
        let second = storage.save(reader(b"b"), "report.xml", ".xml").await.unwrap();
        assert_eq!(first, "2025/01/15/report.xml");
        assert_eq!(second, "2025/01/15/report_1.xml");

        *now.lock().unwrap() = day(16);
        let next_day = storage.save(reader(b"c"), "report.xml", ".xml").await.unwrap();
        assert_eq!(next_day, "2025/01/16/report.xml");
        assert_eq!(storage.read(&next_day).await.unwrap(), b"c");
    }

    #[tokio::test]
    async fn test_monthly_shard_with_base_url() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/files/", ShardFormat::Monthly)
            .await
            .unwrap()
            .with_clock(|| day(3));

        let locator = storage.save(reader(b"x"), "Photo.PNG", ".png").await.unwrap();
        assert_eq!(locator, "/files/2025/01/Photo.png");
        assert!(dir.path().join("2025").join("01").join("Photo.png").exists());
    }

    #[tokio::test]
    async fn test_delete_strips_base_url() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://cdn.example.com", ShardFormat::None)
            .await
            .unwrap();

        let locator = storage.save(reader(b"bye"), "gone.txt", ".txt").await.unwrap();
        storage.delete(&locator).await.unwrap();
        assert!(!storage.exists("gone.txt").await.unwrap());

        let result = storage.delete(&locator).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "", ShardFormat::None)
            .await
            .unwrap();

        let result = storage.read("nope.txt").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "", ShardFormat::None)
            .await
            .unwrap();

        let result = storage.read("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_client_path_components_are_dropped() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "", ShardFormat::None)
            .await
            .unwrap();

        let locator = storage
            .save(reader(b"x"), "../../outside.txt", ".txt")
            .await
            .unwrap();
        assert_eq!(locator, "outside.txt");
        assert!(dir.path().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn test_new_rejects_file_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("file");
        std::fs::write(&file_path, b"not a dir").unwrap();

        let result = LocalStorage::new(&file_path, "", ShardFormat::None).await;
        assert!(matches!(result, Err(StorageError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_custom_filename_policy() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "", ShardFormat::None)
            .await
            .unwrap()
            .with_filename_policy(|dir: &dyn DirectoryView, name: &str, ext: &str| {
                crate::filename::unique_filename(dir, &format!("up-{}", name), ext)
            });

        let locator = storage.save(reader(b"x"), "a.txt", ".txt").await.unwrap();
        assert_eq!(locator, "up-a.txt");
    }

    #[tokio::test]
    async fn test_policy_returning_existing_name_fails() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("fixed.txt"), b"taken").unwrap();
        let storage = LocalStorage::new(dir.path(), "", ShardFormat::None)
            .await
            .unwrap()
            .with_filename_policy(|_: &dyn DirectoryView, _: &str, _: &str| {
                "fixed.txt".to_string()
            });

        let result = storage.save(reader(b"x"), "a.txt", ".txt").await;
        assert!(matches!(result, Err(StorageError::UploadFailed(_))));
        assert_eq!(std::fs::read(dir.path().join("fixed.txt")).unwrap(), b"taken");
    }

    #[tokio::test]
    async fn test_concurrent_saves_get_distinct_names() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(
            LocalStorage::new(dir.path(), "", ShardFormat::None)
                .await
                .unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..16u8 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage.save(reader(&[i]), "same.bin", ".bin").await.unwrap()
            }));
        }

        let mut locators = Vec::new();
        for handle in handles {
            locators.push(handle.await.unwrap());
        }
        locators.sort();
        locators.dedup();
        assert_eq!(locators.len(), 16);
        assert!(locators.contains(&"same.bin".to_string()));
        assert!(locators.contains(&"same_15.bin".to_string()));
    }
}
