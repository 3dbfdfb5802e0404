//! File-backed key-value store.
//!
//! Implements `KvStore` from `freelance-core` as a single JSON object at
//! `{data_dir}/storage.json`. Every write rewrites the whole file through a
//! temporary sibling and a rename, so a crash never leaves a half-written map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use freelance_core::storage::KvStore;
use freelance_types::error::StorageError;

/// File name of the durable store inside the data directory.
pub const STORAGE_FILE: &str = "storage.json";

type Entries = BTreeMap<String, String>;

/// Durable `KvStore`. Clones share the write lock.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileKvStore {
    /// Store backed by `{data_dir}/storage.json`. The file is created on
    /// first write.
    pub fn new(data_dir: &Path) -> Self {
        Self::at(data_dir.join(STORAGE_FILE))
    }

    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self, key: &str) -> Result<Entries, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(err) => {
                return Err(StorageError::Io(format!(
                    "failed to read {}: {err}",
                    self.path.display()
                )));
            }
        };
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&content).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: format!("{} is not a JSON object: {e}", self.path.display()),
        })
    }

    async fn persist(&self, key: &str, entries: &Entries) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(entries).map_err(|e| StorageError::Serialize {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io(format!("failed to create {}: {e}", parent.display())))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| StorageError::Io(format!("failed to write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StorageError::Io(format!("failed to replace {}: {e}", self.path.display())))
    }

    /// Read-modify-write under the write lock. Skips the write when nothing
    /// changed.
    async fn modify<F>(&self, key: &str, f: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut Entries) -> bool,
    {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load(key).await?;
        if f(&mut entries) {
            self.persist(key, &entries).await?;
            tracing::debug!(key, path = %self.path.display(), "durable storage updated");
        }
        Ok(())
    }
}

impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load(key).await?.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.modify(key, |entries| {
            entries.insert(key.to_string(), value);
            true
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.modify(key, |entries| entries.remove(key).is_some()).await
    }
}
