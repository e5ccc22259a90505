//! Atomic JSON file operations.
//!
//! Provides a thin layer for crash-safe writes of JSON documents.

use diary_core::error::DiaryError;
use serde::{Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Errors that can occur during atomic JSON operations.
#[derive(Debug)]
pub enum AtomicJsonError {
    /// File I/O error.
    IoError(std::io::Error),
    /// JSON serialization/deserialization error.
    JsonError(serde_json::Error),
    /// The path cannot hold a file.
    InvalidPath(PathBuf),
}

impl std::fmt::Display for AtomicJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AtomicJsonError::IoError(e) => write!(f, "I/O error: {}", e),
            AtomicJsonError::JsonError(e) => write!(f, "JSON error: {}", e),
            AtomicJsonError::InvalidPath(path) => write!(f, "Invalid file path: {:?}", path),
        }
    }
}

impl std::error::Error for AtomicJsonError {}

impl From<std::io::Error> for AtomicJsonError {
    fn from(e: std::io::Error) -> Self {
        AtomicJsonError::IoError(e)
    }
}

impl From<serde_json::Error> for AtomicJsonError {
    fn from(e: serde_json::Error) -> Self {
        AtomicJsonError::JsonError(e)
    }
}

impl From<AtomicJsonError> for DiaryError {
    fn from(e: AtomicJsonError) -> Self {
        match e {
            AtomicJsonError::IoError(e) => DiaryError::from(e),
            AtomicJsonError::JsonError(e) => DiaryError::from(e),
            AtomicJsonError::InvalidPath(path) => {
                DiaryError::io(format!("Invalid file path: {:?}", path))
            }
        }
    }
}

/// A handle to a JSON file that is replaced atomically on every save.
///
/// - **Atomicity**: updates are all-or-nothing via tmp file + rename
/// - **Durability**: explicit fsync before rename
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// Returns `Ok(None)` when the file doesn't exist or is empty.
    pub async fn load(&self) -> Result<Option<T>, AtomicJsonError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let data: T = serde_json::from_str(&content)?;
        Ok(Some(data))
    }

    /// Saves data atomically, creating the parent directory when needed.
    pub async fn save(&self, data: &T) -> Result<(), AtomicJsonError> {
        let json = serde_json::to_string_pretty(data)?;
        self.write_atomic(json.as_bytes()).await
    }

    /// Removes the file. A missing file is not an error.
    pub async fn remove(&self) -> Result<(), AtomicJsonError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(&self, bytes: &[u8]) -> Result<(), AtomicJsonError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| AtomicJsonError::InvalidPath(self.path.clone()))?;
        fs::create_dir_all(parent).await?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path).await?;
        if let Err(e) = Self::write_and_sync(&mut tmp_file, bytes).await {
            drop(tmp_file);
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e);
        }
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }

    async fn write_and_sync(file: &mut File, bytes: &[u8]) -> Result<(), AtomicJsonError> {
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Temporary file next to the target, so the rename stays on one filesystem.
    fn temp_path(&self) -> Result<PathBuf, AtomicJsonError> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| AtomicJsonError::InvalidPath(self.path.clone()))?;
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| AtomicJsonError::InvalidPath(self.path.clone()))?;

        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}
