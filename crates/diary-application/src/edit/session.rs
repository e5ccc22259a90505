//! Edit session aggregate.
//!
//! `EditSession` is an immutable value: every change produces a new session
//! through the `with_*` helpers. Values the view needs but that follow from the
//! stored fields (visible item count, weather2 options, ...) are computed on
//! demand instead of being stored.

use chrono::NaiveDate;
use diary_core::diary::{Diary, ItemNumber, Weather};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Lifecycle status of an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditStatus {
    /// Ready for user input.
    Idle,
    /// The initial diary is being loaded.
    Loading,
    /// A use-case call is in flight.
    Processing,
    /// A view transition is running; input is blocked without background work.
    InputDisabled,
    /// The initial load failed; the session cannot continue.
    Error,
}

impl EditStatus {
    /// Statuses that only make sense while a task is running in this process.
    pub fn is_transient(self) -> bool {
        matches!(self, EditStatus::Processing | EditStatus::InputDisabled)
    }
}

/// The state of one diary edit screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSession {
    status: EditStatus,
    /// Last loaded or created snapshot; `None` while the initial load runs
    original_diary: Option<Diary>,
    editing_diary: Diary,
    previous_selected_date: Option<NaiveDate>,
    is_new_diary: bool,
}

impl EditSession {
    /// A session waiting for the persisted diary at `date` to load.
    pub fn loading(date: NaiveDate) -> Self {
        Self {
            status: EditStatus::Loading,
            original_diary: None,
            editing_diary: Diary::new(date),
            previous_selected_date: None,
            is_new_diary: false,
        }
    }

    /// A session for a diary that does not exist yet.
    pub fn new_diary(date: NaiveDate) -> Self {
        let diary = Diary::new(date);
        Self {
            status: EditStatus::Idle,
            original_diary: Some(diary.clone()),
            editing_diary: diary,
            previous_selected_date: None,
            is_new_diary: true,
        }
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    pub fn status(&self) -> EditStatus {
        self.status
    }

    pub fn original_diary(&self) -> Option<&Diary> {
        self.original_diary.as_ref()
    }

    pub fn editing_diary(&self) -> &Diary {
        &self.editing_diary
    }

    pub fn previous_selected_date(&self) -> Option<NaiveDate> {
        self.previous_selected_date
    }

    pub fn is_new_diary(&self) -> bool {
        self.is_new_diary
    }

    // ============================================================================
    // Derived values
    // ============================================================================

    pub fn is_processing(&self) -> bool {
        self.status == EditStatus::Processing
    }

    pub fn is_input_disabled(&self) -> bool {
        self.status == EditStatus::InputDisabled
    }

    /// Readiness guard: whether a new intent may be accepted.
    pub fn is_ready(&self) -> bool {
        !self.is_processing() && !self.is_input_disabled() && self.original_diary.is_some()
    }

    /// Date of the loaded snapshot, falling back to the working copy while loading.
    pub fn original_date(&self) -> NaiveDate {
        self.original_diary
            .as_ref()
            .map_or(self.editing_diary.date, |diary| diary.date)
    }

    pub fn num_visible_items(&self) -> usize {
        self.editing_diary.items.num_visible()
    }

    pub fn is_item_visible(&self, number: ItemNumber) -> bool {
        usize::from(number.get()) <= self.num_visible_items()
    }

    pub fn is_item_addition_enabled(&self) -> bool {
        self.editing_diary.items.can_append()
    }

    pub fn is_weather2_enabled(&self) -> bool {
        self.editing_diary.weather1.is_known()
    }

    /// Choices offered for weather2: everything except the current weather1.
    pub fn weather2_options(&self) -> Vec<Weather> {
        let weather1 = self.editing_diary.weather1;
        Weather::ALL
            .into_iter()
            .filter(|weather| !weather.is_known() || *weather != weather1)
            .collect()
    }

    /// Whether the working copy differs from the loaded snapshot.
    pub fn has_unsaved_changes(&self) -> bool {
        self.original_diary
            .as_ref()
            .is_some_and(|original| !original.has_same_content(&self.editing_diary))
    }

    /// Where the attached image can be displayed from.
    ///
    /// An image already saved with the loaded diary lives in `image_dir`; one picked
    /// during this edit still lives in `image_cache_dir`.
    pub fn attached_image_path(&self, image_dir: &Path, image_cache_dir: &Path) -> Option<PathBuf> {
        let file_name = self.editing_diary.image_file_name.as_deref()?;
        let saved = self
            .original_diary
            .as_ref()
            .and_then(|diary| diary.image_file_name.as_deref());
        let dir = if saved == Some(file_name) {
            image_dir
        } else {
            image_cache_dir
        };
        Some(dir.join(file_name))
    }

    // ============================================================================
    // Functional updates
    // ============================================================================

    pub fn with_status(mut self, status: EditStatus) -> Self {
        self.status = status;
        self
    }

    /// Applies `edit` to the working copy.
    pub fn with_editing(mut self, edit: impl FnOnce(&mut Diary)) -> Self {
        edit(&mut self.editing_diary);
        self
    }

    /// Moves the working copy to `date`, remembering the date it had before.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.previous_selected_date = Some(self.editing_diary.date);
        self.editing_diary.date = date;
        self
    }

    /// Replaces both snapshots with a persisted diary.
    pub fn with_loaded(mut self, diary: Diary) -> Self {
        self.original_diary = Some(diary.clone());
        self.editing_diary = diary;
        self.previous_selected_date = None;
        self.is_new_diary = false;
        self
    }

    /// Normalizes a session read back after a process restart.
    ///
    /// Nothing can be in flight in a fresh process, so transient statuses fall back
    /// to `Idle`.
    pub fn restored(self) -> Self {
        if self.status.is_transient() {
            self.with_status(EditStatus::Idle)
        } else {
            self
        }
    }
}
