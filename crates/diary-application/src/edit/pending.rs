//! Operations staged while a confirmation dialog is open.
//!
//! Each kind of operation has its own slot, so different confirmations can be
//! staged at the same time. A slot is filled when the dialog is requested and
//! consumed exactly once when its result comes back.

use chrono::NaiveDate;
use diary_core::diary::{Diary, DiaryId, ItemNumber, ItemTitleSelectionHistory};
use std::collections::HashMap;

/// Discriminant of [`PendingOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingOperationKind {
    LoadConflict,
    UpdateConflict,
    DeleteConfirm,
    DateChange,
    ItemDelete,
    WeatherFetch,
    ExitWithoutSave,
    LoadRetry,
}

/// Switching to `date` would discard the diary persisted there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConflict {
    pub date: NaiveDate,
    pub previous_date: Option<NaiveDate>,
}

/// Saving would overwrite a different diary persisted at the same date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateConflict {
    pub diary: Diary,
    pub history: Vec<ItemTitleSelectionHistory>,
    pub original_diary: Diary,
    pub is_new_diary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirm {
    pub id: DiaryId,
    pub date: NaiveDate,
}

/// The date picker is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateChange {
    pub original_date: NaiveDate,
    pub is_new_diary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDelete {
    pub item_number: ItemNumber,
}

/// Fetching weather would replace what the user already entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherFetch {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitWithoutSave {
    pub original_date: NaiveDate,
}

/// Loading the diary at `date` failed; the user may try again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRetry {
    pub date: NaiveDate,
}

/// Parameters of a mutation awaiting the user's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOperation {
    LoadConflict(LoadConflict),
    UpdateConflict(UpdateConflict),
    DeleteConfirm(DeleteConfirm),
    DateChange(DateChange),
    ItemDelete(ItemDelete),
    WeatherFetch(WeatherFetch),
    ExitWithoutSave(ExitWithoutSave),
    LoadRetry(LoadRetry),
}

impl PendingOperation {
    pub fn kind(&self) -> PendingOperationKind {
        match self {
            PendingOperation::LoadConflict(_) => PendingOperationKind::LoadConflict,
            PendingOperation::UpdateConflict(_) => PendingOperationKind::UpdateConflict,
            PendingOperation::DeleteConfirm(_) => PendingOperationKind::DeleteConfirm,
            PendingOperation::DateChange(_) => PendingOperationKind::DateChange,
            PendingOperation::ItemDelete(_) => PendingOperationKind::ItemDelete,
            PendingOperation::WeatherFetch(_) => PendingOperationKind::WeatherFetch,
            PendingOperation::ExitWithoutSave(_) => PendingOperationKind::ExitWithoutSave,
            PendingOperation::LoadRetry(_) => PendingOperationKind::LoadRetry,
        }
    }
}

/// Typed access to one variant of [`PendingOperation`].
pub trait StagedOperation: Into<PendingOperation> + Sized {
    const KIND: PendingOperationKind;

    fn from_pending(operation: PendingOperation) -> Option<Self>;
}

macro_rules! staged_operation {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for PendingOperation {
                fn from(operation: $variant) -> Self {
                    PendingOperation::$variant(operation)
                }
            }

            impl StagedOperation for $variant {
                const KIND: PendingOperationKind = PendingOperationKind::$variant;

                fn from_pending(operation: PendingOperation) -> Option<Self> {
                    match operation {
                        PendingOperation::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )*
    };
}

staged_operation!(
    LoadConflict,
    UpdateConflict,
    DeleteConfirm,
    DateChange,
    ItemDelete,
    WeatherFetch,
    ExitWithoutSave,
    LoadRetry,
);

/// One nullable slot per [`PendingOperationKind`].
#[derive(Debug, Default)]
pub struct PendingOperationCache {
    slots: HashMap<PendingOperationKind, PendingOperation>,
}

impl PendingOperationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `operation`, replacing whatever its kind held before.
    pub fn stage(&mut self, operation: impl Into<PendingOperation>) {
        let operation = operation.into();
        let kind = operation.kind();
        if self.slots.insert(kind, operation).is_some() {
            tracing::debug!("[PendingOperationCache] Replaced stale {:?} operation", kind);
        }
    }

    /// Reads and clears the staged operation of type `T`.
    ///
    /// # Panics
    ///
    /// Panics when nothing of that kind is staged. A dialog result can only arrive for
    /// a dialog that was opened after staging, so an empty slot is a logic error.
    pub fn consume<T: StagedOperation>(&mut self) -> T {
        match self.try_consume::<T>() {
            Some(operation) => operation,
            None => panic!("no pending {:?} operation was staged", T::KIND),
        }
    }

    /// Reads and clears the staged operation of type `T`, if any.
    pub fn try_consume<T: StagedOperation>(&mut self) -> Option<T> {
        self.slots.remove(&T::KIND).and_then(T::from_pending)
    }

    pub fn is_staged(&self, kind: PendingOperationKind) -> bool {
        self.slots.contains_key(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
