//! Use-case interfaces consumed by the edit session.
//!
//! Each trait is an already-validated external operation. The edit orchestrator
//! never inspects how they work; it only reacts to their success or failure.

use super::model::{Diary, DiaryId, ItemTitleSelectionHistory, Weather};
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Loading, saving and deleting diary entries.
#[async_trait]
pub trait DiaryUseCase: Send + Sync {
    /// Loads the diary with the given identity.
    async fn load_diary_by_id(&self, id: DiaryId) -> Result<Diary>;

    /// Loads the diary persisted for `date`.
    async fn load_diary_by_date(&self, date: NaiveDate) -> Result<Diary>;

    /// Saves `diary` and records the item titles it uses.
    ///
    /// # Arguments
    ///
    /// * `diary` - The working copy to persist
    /// * `history` - Item titles to add to the selection history
    /// * `original` - The snapshot the working copy was edited from
    /// * `is_new_diary` - Whether `original` was never persisted
    async fn save_diary(
        &self,
        diary: &Diary,
        history: &[ItemTitleSelectionHistory],
        original: &Diary,
        is_new_diary: bool,
    ) -> Result<()>;

    /// Deletes the diary and its attached image.
    ///
    /// Returns [`DiaryError::ImageDelete`](crate::error::DiaryError::ImageDelete) when
    /// the entry was removed but its image was not.
    async fn delete_diary(&self, id: DiaryId) -> Result<()>;
}

/// Business predicates deciding whether the user must confirm an operation.
#[async_trait]
pub trait EditConfirmationPolicy: Send + Sync {
    /// Whether changing to `date` would discard a diary persisted at that date.
    async fn should_request_load_confirmation(
        &self,
        date: NaiveDate,
        previous_date: Option<NaiveDate>,
        original_date: NaiveDate,
        is_new_diary: bool,
    ) -> Result<bool>;

    /// Whether saving at `date` would overwrite a different persisted diary.
    async fn should_request_update_confirmation(
        &self,
        date: NaiveDate,
        original_date: NaiveDate,
        is_new_diary: bool,
    ) -> Result<bool>;

    /// Whether fetching weather for `date` must first be confirmed.
    async fn should_request_weather_confirmation(
        &self,
        date: NaiveDate,
        previous_date: Option<NaiveDate>,
    ) -> Result<bool>;

    /// Whether weather should be fetched at all for `date`.
    async fn should_fetch_weather(
        &self,
        date: NaiveDate,
        previous_date: Option<NaiveDate>,
    ) -> Result<bool>;
}

#[async_trait]
pub trait WeatherUseCase: Send + Sync {
    async fn fetch_weather_info(&self, date: NaiveDate) -> Result<Weather>;
}

/// Temporary cache for an image picked but not yet saved with a diary.
#[async_trait]
pub trait ImageCacheUseCase: Send + Sync {
    /// Copies the image at `source` into the cache and returns its file name.
    async fn cache_image(&self, source: &str) -> Result<String>;

    /// Removes the cached file left by an abandoned edit.
    async fn clear_image_cache_file(&self) -> Result<()>;
}
