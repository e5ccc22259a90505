//! Messages shown to the user when an edit operation fails.

use chrono::NaiveDate;
use diary_core::error::DiaryError;

/// Which confirmation check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOperation {
    Load,
    Update,
    Weather,
}

/// What a failed delete was removing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    Entry,
    /// The entry is gone; only its attached image remains.
    Image,
}

/// User-facing failure, shown as a message dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditMessage {
    /// Loading the diary at `date` failed; offers to retry or discard.
    LoadFailure { date: NaiveDate },
    /// The diary the screen was opened for could not be loaded.
    InitialLoadFailure,
    SaveFailure,
    StorageExhausted,
    DeleteFailure { target: DeleteTarget, date: NaiveDate },
    ConfirmationCheckFailure { operation: ConfirmationOperation },
    WeatherFetchFailure,
    ImageCacheFailure,
    Unknown { cause: String },
}

impl EditMessage {
    pub fn from_save_error(error: &DiaryError) -> Self {
        match error {
            DiaryError::StorageExhausted(_) => EditMessage::StorageExhausted,
            DiaryError::Internal(cause) => EditMessage::Unknown {
                cause: cause.clone(),
            },
            _ => EditMessage::SaveFailure,
        }
    }

    pub fn from_delete_error(error: &DiaryError, date: NaiveDate) -> Self {
        match error {
            DiaryError::ImageDelete { .. } => EditMessage::DeleteFailure {
                target: DeleteTarget::Image,
                date,
            },
            DiaryError::Internal(cause) => EditMessage::Unknown {
                cause: cause.clone(),
            },
            _ => EditMessage::DeleteFailure {
                target: DeleteTarget::Entry,
                date,
            },
        }
    }

    /// Whether closing this message leaves the edit screen.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            EditMessage::InitialLoadFailure
                | EditMessage::DeleteFailure {
                    target: DeleteTarget::Image,
                    ..
                }
        )
    }
}
