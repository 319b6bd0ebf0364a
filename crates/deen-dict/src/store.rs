//! Persistent keyed storage for fetched resources.
//!
//! A [`CacheStorage`] holds named partitions, each partition a [`Cache`]
//! mapping a URL to the raw response body.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::error::StoreError;

#[async_trait::async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, url: &str) -> Result<Option<Bytes>, StoreError>;

    /// Store a body, overwriting any previous one
    async fn put(&self, url: &str, body: Bytes) -> Result<(), StoreError>;

    /// Returns whether something was removed
    async fn delete(&self, url: &str) -> Result<bool, StoreError>;
}

#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a partition, creating it when missing
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, StoreError>;

    async fn keys(&self) -> Result<Vec<String>, StoreError>;

    async fn delete(&self, name: &str) -> Result<bool, StoreError>;
}

/// Delete every partition not named in `keep`. Returns the deleted names.
pub async fn prune_partitions(
    storage: &dyn CacheStorage,
    keep: &[&str],
) -> Result<Vec<String>, StoreError> {
    let mut deleted = Vec::new();
    for name in storage.keys().await? {
        if keep.contains(&name.as_str()) {
            continue;
        }
        if storage.delete(&name).await? {
            tracing::info!("Deleted stale cache partition {name}");
            deleted.push(name);
        }
    }
    Ok(deleted)
}

fn key_file_name(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Directory-backed storage: one directory per partition, one file per key
pub struct FsCacheStorage {
    root: PathBuf,
    opened: Mutex<HashMap<String, Arc<FsCache>>>,
}

impl FsCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            opened: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn forget(&self, name: &str) {
        if let Ok(mut opened) = self.opened.lock() {
            opened.remove(name);
        }
    }
}

#[async_trait::async_trait]
impl CacheStorage for FsCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, StoreError> {
        let existing = self.opened.lock().ok().and_then(|o| o.get(name).cloned());
        if let Some(cache) = existing {
            return Ok(cache);
        }

        let dir = self.root.join(name);
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!("Opened cache partition {}", dir.display());

        let cache = Arc::new(FsCache { dir });
        if let Ok(mut opened) = self.opened.lock() {
            opened.insert(name.to_string(), cache.clone());
        }
        Ok(cache)
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        self.forget(name);
        match tokio::fs::remove_dir_all(self.root.join(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(key_file_name(url))
    }
}

#[async_trait::async_trait]
impl Cache for FsCache {
    async fn get(&self, url: &str) -> Result<Option<Bytes>, StoreError> {
        match tokio::fs::read(self.path_for(url)).await {
            Ok(body) => Ok(Some(Bytes::from(body))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, url: &str, body: Bytes) -> Result<(), StoreError> {
        let path = self.path_for(url);
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!("Cached {} bytes for {url}", body.len());
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(self.path_for(url)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process storage, used with `--no-cache` and in tests
#[derive(Default)]
pub struct MemoryCacheStorage {
    partitions: Mutex<HashMap<String, Arc<MemoryCache>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>, StoreError> {
        let mut partitions = self.partitions.lock().map_err(poisoned)?;
        let cache = partitions.entry(name.to_string()).or_default().clone();
        Ok(cache)
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let partitions = self.partitions.lock().map_err(poisoned)?;
        let mut names: Vec<String> = partitions.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let mut partitions = self.partitions.lock().map_err(poisoned)?;
        Ok(partitions.remove(name).is_some())
    }
}

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Bytes>>,
}

#[async_trait::async_trait]
impl Cache for MemoryCache {
    async fn get(&self, url: &str) -> Result<Option<Bytes>, StoreError> {
        let entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries.get(url).cloned())
    }

    async fn put(&self, url: &str, body: Bytes) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.insert(url.to_string(), body);
        Ok(())
    }

    async fn delete(&self, url: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        Ok(entries.remove(url).is_some())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::IoError(std::io::Error::other("cache lock poisoned"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn exercise_cache(storage: &dyn CacheStorage) {
        let cache = storage.open("DeEnDict").await.unwrap();
        let url = "https://example.org/de-en.txt.gz";

        assert_eq!(cache.get(url).await.unwrap(), None);
        cache.put(url, Bytes::from_static(b"one")).await.unwrap();
        cache.put(url, Bytes::from_static(b"two")).await.unwrap();
        assert_eq!(cache.get(url).await.unwrap(), Some(Bytes::from_static(b"two")));

        // reopening sees the same data
        let again = storage.open("DeEnDict").await.unwrap();
        assert_eq!(again.get(url).await.unwrap(), Some(Bytes::from_static(b"two")));

        assert!(cache.delete(url).await.unwrap());
        assert!(!cache.delete(url).await.unwrap());
        assert_eq!(cache.get(url).await.unwrap(), None);
    }

    async fn exercise_prune(storage: &dyn CacheStorage) {
        for name in ["DeEnDict", "DeEnDict-0.0.9", "DeEnDict-0.1.0"] {
            storage.open(name).await.unwrap();
        }
        let deleted = prune_partitions(storage, &["DeEnDict", "DeEnDict-0.1.0"])
            .await
            .unwrap();
        assert_eq!(deleted, vec!["DeEnDict-0.0.9".to_string()]);
        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["DeEnDict".to_string(), "DeEnDict-0.1.0".to_string()]
        );
    }

    #[tokio::test]
    async fn test_memory_cache() {
        exercise_cache(&MemoryCacheStorage::new()).await;
    }

    #[tokio::test]
    async fn test_memory_prune() {
        exercise_prune(&MemoryCacheStorage::new()).await;
    }

    #[tokio::test]
    async fn test_fs_cache() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsCacheStorage::new(dir.path());
        exercise_cache(&storage).await;
    }

    #[tokio::test]
    async fn test_fs_prune() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsCacheStorage::new(dir.path());
        exercise_prune(&storage).await;
        assert!(!dir.path().join("DeEnDict-0.0.9").exists());
    }

    #[tokio::test]
    async fn test_fs_file_names_are_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsCacheStorage::new(dir.path());
        let cache = storage.open("DeEnDict").await.unwrap();
        cache
            .put("https://example.org/version.txt", Bytes::from_static(b"v1"))
            .await
            .unwrap();

        let name = key_file_name("https://example.org/version.txt");
        assert_eq!(name.len(), 64);
        let stored = std::fs::read(dir.path().join("DeEnDict").join(name)).unwrap();
        assert_eq!(stored, b"v1");
    }

    #[tokio::test]
    async fn test_fs_keys_without_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsCacheStorage::new(dir.path().join("missing"));
        assert!(storage.keys().await.unwrap().is_empty());
    }
}
