//! Cache for images picked while a diary is being edited.
//!
//! A picked image is copied into the cache directory under a fresh name. It is
//! moved into the image directory when the diary is saved, and removed when the
//! edit is abandoned.

use async_trait::async_trait;
use diary_core::config::EditorConfig;
use diary_core::diary::ImageCacheUseCase;
use diary_core::error::{DiaryError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

pub struct FileImageCache {
    cache_dir: PathBuf,
    /// The most recently cached file; only one is kept at a time
    current: Mutex<Option<PathBuf>>,
}

impl FileImageCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            current: Mutex::new(None),
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(config.image_cache_dir.clone())
    }

    fn cached_name(source: &Path) -> String {
        match source.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase()),
            None => Uuid::new_v4().to_string(),
        }
    }
}

#[async_trait]
impl ImageCacheUseCase for FileImageCache {
    async fn cache_image(&self, source: &str) -> Result<String> {
        let source = Path::new(source);
        if !fs::try_exists(source).await? {
            return Err(DiaryError::not_found("image", source.display().to_string()));
        }

        fs::create_dir_all(&self.cache_dir).await?;
        let file_name = Self::cached_name(source);
        let target = self.cache_dir.join(&file_name);
        fs::copy(source, &target).await?;

        let previous = self.current.lock().await.replace(target);
        if let Some(previous) = previous {
            if let Err(e) = fs::remove_file(&previous).await {
                tracing::warn!(
                    "[FileImageCache] Failed to remove superseded image {:?}: {}",
                    previous,
                    e
                );
            }
        }

        tracing::debug!("[FileImageCache] Cached {:?} as {}", source, file_name);
        Ok(file_name)
    }

    async fn clear_image_cache_file(&self) -> Result<()> {
        let Some(path) = self.current.lock().await.take() else {
            return Ok(());
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
