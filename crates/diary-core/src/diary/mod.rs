//! Diary domain module.
//!
//! # Module Structure
//!
//! - `model`: Diary entity and value types (`Diary`, `Weather`, `Condition`)
//! - `items`: Ordered item slots and their compaction rules (`DiaryItems`)
//! - `usecase`: External use-case interfaces consumed by the edit session

mod items;
mod model;
mod usecase;

// Re-export public API
pub use items::{DiaryItem, DiaryItems, ItemNumber, ItemSlotError, MAX_ITEMS};
pub use model::{Condition, Diary, DiaryId, ItemTitleSelectionHistory, Weather};
pub use usecase::{DiaryUseCase, EditConfirmationPolicy, ImageCacheUseCase, WeatherUseCase};
