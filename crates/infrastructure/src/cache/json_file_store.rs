//! JSON file cache store
//!
//! The whole cache is one pretty-printed JSON document. Saves write a
//! temporary file next to the target, fsync it and rename it over the
//! target, so a crash mid-write leaves the previous file intact.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use application::{
    error::ApplicationError,
    ports::{CacheSnapshot, CacheStorePort},
};
use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// File-backed cache store
#[derive(Debug, Clone)]
pub struct JsonFileCacheStore {
    path: PathBuf,
}

impl JsonFileCacheStore {
    /// Create a store persisting to `path`; nothing is touched until the first save
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<Option<CacheSnapshot>, ApplicationError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ApplicationError::Persistence(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            },
        };

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            ApplicationError::Persistence(format!("Corrupt cache file {}: {e}", path.display()))
        })
    }

    fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    async fn write_snapshot(&self, snapshot: &CacheSnapshot) -> Result<(), ApplicationError> {
        let bytes = serde_json::to_vec_pretty(snapshot).map_err(|e| {
            ApplicationError::Persistence(format!("Snapshot serialization error: {e}"))
        })?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || Self::write_atomic(&path, &bytes))
            .await
            .map_err(|e| ApplicationError::Persistence(format!("Cache write task failed: {e}")))?
            .map_err(|e| {
                ApplicationError::Persistence(format!(
                    "Failed to write {}: {e}",
                    self.path.display()
                ))
            })
    }
}

#[async_trait]
impl CacheStorePort for JsonFileCacheStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<CacheSnapshot>, ApplicationError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || Self::read(&path))
            .await
            .map_err(|e| ApplicationError::Persistence(format!("Cache read task failed: {e}")))?
    }

    #[instrument(skip(self, snapshot), fields(entries = snapshot.len()))]
    async fn save(&self, snapshot: &CacheSnapshot) -> Result<(), ApplicationError> {
        self.write_snapshot(snapshot).await?;
        debug!(path = %self.path.display(), "Cache snapshot written");
        Ok(())
    }

    async fn clear(&self) -> Result<(), ApplicationError> {
        self.write_snapshot(&CacheSnapshot::new()).await
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn size_bytes(&self) -> Option<u64> {
        tokio::fs::metadata(&self.path).await.ok().map(|m| m.len())
    }
}

#[cfg(test)]
mod tests {
    use application::ports::CacheEntry;
    use chrono::Utc;
    use domain::{GenerationOptions, GenerationOutput, GenerationRequest};
    use tempfile::TempDir;

    use super::*;

    fn snapshot_with(prompts: &[&str]) -> CacheSnapshot {
        let mut snapshot = CacheSnapshot::new();
        for prompt in prompts {
            let request =
                GenerationRequest::parse(*prompt, "model-a", GenerationOptions::default()).unwrap();
            snapshot.insert(CacheEntry {
                key: request.fingerprint(),
                value: GenerationOutput::new(format!("answer: {prompt}"), "model-a"),
                created_at: Utc::now(),
                original_latency_ms: 900,
                model: request.model,
            });
        }
        snapshot
    }

    fn store_in(dir: &TempDir) -> JsonFileCacheStore {
        JsonFileCacheStore::new(dir.path().join("llm_cache.json"))
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(store.load().await.unwrap().is_none());
        assert!(store.size_bytes().await.is_none());
    }

    #[tokio::test]
    async fn save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let snapshot = snapshot_with(&["one", "two"]);

        store.save(&snapshot).await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded, snapshot);
        assert!(store.size_bytes().await.unwrap() > 0);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for n in 1..=3 {
            let prompts: Vec<String> = (0..n).map(|i| format!("prompt {i}")).collect();
            let refs: Vec<&str> = prompts.iter().map(String::as_str).collect();
            store.save(&snapshot_with(&refs)).await.unwrap();
        }

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("llm_cache.json")]);
        assert_eq!(store.load().await.unwrap().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileCacheStore::new(dir.path().join("nested/deeper/cache.json"));

        store.save(&snapshot_with(&["one"])).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), b"{ not json").unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, ApplicationError::Persistence(m) if m.contains("Corrupt")));
    }

    #[tokio::test]
    async fn empty_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), b"").unwrap();

        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn clear_writes_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&snapshot_with(&["one"])).await.unwrap();

        store.clear().await.unwrap();
        let loaded = store.load().await.unwrap().unwrap();
        assert!(loaded.is_empty());
        assert!(loaded.is_supported());
    }

    #[tokio::test]
    async fn file_is_human_readable_json() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&snapshot_with(&["one"])).await.unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["entries"].as_object().unwrap().len(), 1);
        assert!(text.contains('\n'));
    }

    #[tokio::test]
    async fn unwritable_location_is_an_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a directory").unwrap();
        let store = JsonFileCacheStore::new(blocker.join("cache.json"));

        let err = store.save(&CacheSnapshot::new()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Persistence(_)));
    }

    #[test]
    fn location_is_the_path() {
        let store = JsonFileCacheStore::new("/var/cache/llm_cache.json");
        assert_eq!(store.location(), "/var/cache/llm_cache.json");
    }
}
