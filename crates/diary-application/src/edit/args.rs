//! Navigation arguments the edit screen is opened with, and the result it returns.

use chrono::NaiveDate;
use diary_core::diary::DiaryId;
use serde::{Deserialize, Serialize};

/// Screen the editor was opened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchSource {
    DiaryList,
    Calendar,
    DiaryShow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditArgs {
    /// Key the caller listens on for the edit result
    pub result_key: String,
    /// Identity of the diary to edit; `None` creates a new entry
    pub diary_id: Option<DiaryId>,
    pub diary_date: NaiveDate,
    pub launch_source: LaunchSource,
}

impl EditArgs {
    pub fn new_diary(result_key: impl Into<String>, date: NaiveDate, launch_source: LaunchSource) -> Self {
        Self {
            result_key: result_key.into(),
            diary_id: None,
            diary_date: date,
            launch_source,
        }
    }

    pub fn existing(
        result_key: impl Into<String>,
        id: DiaryId,
        date: NaiveDate,
        launch_source: LaunchSource,
    ) -> Self {
        Self {
            result_key: result_key.into(),
            diary_id: Some(id),
            diary_date: date,
            launch_source,
        }
    }
}

/// Outcome handed back to the caller when the screen is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "date", rename_all = "snake_case")]
pub enum EditResult {
    Saved(NaiveDate),
    Deleted(NaiveDate),
    /// Left without persisting anything; carries the date to return to.
    Unchanged(NaiveDate),
}
