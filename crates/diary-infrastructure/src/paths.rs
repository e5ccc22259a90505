//! Platform directories for the diary editor.
//!
//! ```text
//! ~/.config/diary/             # Config directory
//! └── config.toml              # EditorConfig
//!
//! ~/.local/share/diary/        # Data directory; relative config paths resolve here
//! ├── diaries/
//! ├── images/
//! ├── image_cache/
//! └── saved_state/
//! ```

use diary_core::config::EditorConfig;
use std::path::PathBuf;

const APP_DIR_NAME: &str = "diary";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur during path resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// No platform config directory could be determined.
    ConfigDirNotFound,
    /// No platform data directory could be determined.
    DataDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find config directory"),
            PathError::DataDirNotFound => write!(f, "Cannot find data directory"),
        }
    }
}

impl std::error::Error for PathError {}

pub struct DiaryPaths;

impl DiaryPaths {
    /// Returns the editor configuration directory (e.g. `~/.config/diary/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the editor data directory (e.g. `~/.local/share/diary/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PathError::DataDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Resolves the relative directories of `config` against the data directory.
    pub fn resolve(config: EditorConfig) -> Result<EditorConfig, PathError> {
        Ok(config.rooted_at(&Self::data_dir()?))
    }
}
