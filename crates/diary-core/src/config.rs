//! Editor configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Key under which the edit session is saved when none is configured.
pub const DEFAULT_SAVED_STATE_KEY: &str = "diary_edit_session";

/// Root configuration for the diary editor.
///
/// Every field has a default so a partial `config.toml` is valid.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EditorConfig {
    /// Key of the edit session in the saved state store
    pub saved_state_key: String,
    /// Directory holding persisted diaries (one JSON file per date)
    pub diary_dir: PathBuf,
    /// Directory holding images attached to saved diaries
    pub image_dir: PathBuf,
    /// Directory holding images picked during an edit that is not yet saved
    pub image_cache_dir: PathBuf,
    /// Directory used by the file-backed saved state store
    pub saved_state_dir: PathBuf,
    /// Whether weather may be fetched when the date changes
    pub weather_fetch_enabled: bool,
    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            saved_state_key: DEFAULT_SAVED_STATE_KEY.to_string(),
            diary_dir: PathBuf::from("diaries"),
            image_dir: PathBuf::from("images"),
            image_cache_dir: PathBuf::from("image_cache"),
            saved_state_dir: PathBuf::from("saved_state"),
            weather_fetch_enabled: true,
            log_filter: "info".to_string(),
        }
    }
}

impl EditorConfig {
    /// Resolves every relative directory against `base`.
    pub fn rooted_at(mut self, base: &std::path::Path) -> Self {
        for dir in [
            &mut self.diary_dir,
            &mut self.image_dir,
            &mut self.image_cache_dir,
            &mut self.saved_state_dir,
        ] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        self
    }
}
