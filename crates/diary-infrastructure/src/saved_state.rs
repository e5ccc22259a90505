//! `SavedStateStore` implementations.
//!
//! `FileSavedStateStore` keeps one JSON document per key so an edit session
//! survives a process restart. `InMemorySavedStateStore` is for embedding and
//! tests where nothing has to outlive the process.

use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use diary_core::error::{DiaryError, Result};
use diary_core::state::SavedStateStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemorySavedStateStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemorySavedStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SavedStateStore for InMemorySavedStateStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn store(&self, key: &str, value: String) -> Result<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

/// On-disk envelope of a saved value.
#[derive(Debug, Serialize, Deserialize)]
struct SavedValue {
    key: String,
    value: String,
}

/// File-backed saved state: `<dir>/<key>.json`.
pub struct FileSavedStateStore {
    dir: PathBuf,
    /// Serializes writers within this process
    lock: RwLock<()>,
}

impl FileSavedStateStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            lock: RwLock::new(()),
        }
    }

    fn file(&self, key: &str) -> Result<AtomicJsonFile<SavedValue>> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(DiaryError::config(format!("Invalid saved state key: {:?}", key)));
        }
        Ok(AtomicJsonFile::new(self.dir.join(format!("{}.json", key))))
    }
}

#[async_trait]
impl SavedStateStore for FileSavedStateStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let file = self.file(key)?;
        let _guard = self.lock.read().await;
        let saved = file.load().await?;
        Ok(saved.map(|saved| saved.value))
    }

    async fn store(&self, key: &str, value: String) -> Result<()> {
        let file = self.file(key)?;
        let _guard = self.lock.write().await;
        file.save(&SavedValue {
            key: key.to_string(),
            value,
        })
        .await?;
        tracing::trace!("[FileSavedStateStore] Stored {:?}", key);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let file = self.file(key)?;
        let _guard = self.lock.write().await;
        file.remove().await?;
        tracing::debug!("[FileSavedStateStore] Removed {:?}", key);
        Ok(())
    }
}
