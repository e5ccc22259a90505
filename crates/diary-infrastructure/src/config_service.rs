//! Configuration service implementation.
//!
//! This module provides a ConfigService that loads the editor configuration
//! from the configuration file (~/.config/diary/config.toml).

use crate::paths::DiaryPaths;
use diary_core::config::EditorConfig;
use diary_core::error::{DiaryError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// Configuration service that loads and caches the editor configuration.
///
/// A missing file yields the defaults; a file that cannot be parsed is logged and
/// also yields the defaults.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<EditorConfig>>>,
}

impl ConfigService {
    /// Creates a service reading the platform config file.
    pub fn new() -> Self {
        let path = match DiaryPaths::config_file() {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("[ConfigService] {}; using default configuration", e);
                None
            }
        };
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> EditorConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = match self.path.as_deref() {
            Some(path) => Self::load_from(path).unwrap_or_else(|e| {
                tracing::warn!(
                    "[ConfigService] Failed to load {:?}: {}; using defaults",
                    path,
                    e
                );
                EditorConfig::default()
            }),
            None => EditorConfig::default(),
        };

        {
            let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    /// Reads an `EditorConfig` from a TOML file; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<EditorConfig> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(EditorConfig::default());
            }
            Err(e) => return Err(DiaryError::from(e)),
        };
        Ok(toml::from_str(&content)?)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}
