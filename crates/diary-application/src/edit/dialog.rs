//! Answers coming back from confirmation dialogs.

use super::pending::PendingOperationKind;
use chrono::NaiveDate;

/// The button a dialog was closed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogResult<T = ()> {
    Positive(T),
    Negative,
    Cancel,
}

impl<T> DialogResult<T> {
    pub fn is_positive(&self) -> bool {
        matches!(self, DialogResult::Positive(_))
    }
}

/// A dialog result, tagged with the dialog it answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogResponse {
    LoadConflict(DialogResult),
    UpdateConflict(DialogResult),
    DeleteConfirm(DialogResult),
    /// The date picker returns the picked date.
    DatePicker(DialogResult<NaiveDate>),
    ItemDelete(DialogResult),
    WeatherFetch(DialogResult),
    ExitWithoutSave(DialogResult),
    /// Positive retries a failed load, anything else discards it.
    LoadRetry(DialogResult),
}

impl DialogResponse {
    /// The pending operation this response resolves.
    pub fn kind(&self) -> PendingOperationKind {
        match self {
            DialogResponse::LoadConflict(_) => PendingOperationKind::LoadConflict,
            DialogResponse::UpdateConflict(_) => PendingOperationKind::UpdateConflict,
            DialogResponse::DeleteConfirm(_) => PendingOperationKind::DeleteConfirm,
            DialogResponse::DatePicker(_) => PendingOperationKind::DateChange,
            DialogResponse::ItemDelete(_) => PendingOperationKind::ItemDelete,
            DialogResponse::WeatherFetch(_) => PendingOperationKind::WeatherFetch,
            DialogResponse::ExitWithoutSave(_) => PendingOperationKind::ExitWithoutSave,
            DialogResponse::LoadRetry(_) => PendingOperationKind::LoadRetry,
        }
    }
}
