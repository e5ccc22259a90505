//! Confirmation predicates backed by the diary files.

use crate::file_diary_repository::FileDiaryRepository;
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use diary_core::config::EditorConfig;
use diary_core::diary::EditConfirmationPolicy;
use diary_core::error::Result;
use std::sync::Arc;

/// Answers confirmation questions by looking at what is persisted.
///
/// - Loading is confirmed when a diary already exists at the picked date.
/// - Saving is confirmed when it would overwrite a different diary at the same date.
/// - Weather is only fetched for dates up to today, and fetching after the user moved
///   the date asks first since weather may already have been entered.
pub struct RepositoryConfirmationPolicy {
    repository: Arc<FileDiaryRepository>,
    weather_fetch_enabled: bool,
    today: Arc<dyn Fn() -> NaiveDate + Send + Sync>,
}

impl RepositoryConfirmationPolicy {
    pub fn new(repository: Arc<FileDiaryRepository>, config: &EditorConfig) -> Self {
        Self {
            repository,
            weather_fetch_enabled: config.weather_fetch_enabled,
            today: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replaces the clock used to decide which dates have weather.
    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Arc::new(today);
        self
    }
}

#[async_trait]
impl EditConfirmationPolicy for RepositoryConfirmationPolicy {
    async fn should_request_load_confirmation(
        &self,
        date: NaiveDate,
        _previous_date: Option<NaiveDate>,
        original_date: NaiveDate,
        is_new_diary: bool,
    ) -> Result<bool> {
        if !is_new_diary && date == original_date {
            return Ok(false);
        }
        self.repository.exists_at(date).await
    }

    async fn should_request_update_confirmation(
        &self,
        date: NaiveDate,
        original_date: NaiveDate,
        is_new_diary: bool,
    ) -> Result<bool> {
        if !is_new_diary && date == original_date {
            return Ok(false);
        }
        self.repository.exists_at(date).await
    }

    async fn should_request_weather_confirmation(
        &self,
        _date: NaiveDate,
        previous_date: Option<NaiveDate>,
    ) -> Result<bool> {
        Ok(previous_date.is_some())
    }

    async fn should_fetch_weather(
        &self,
        date: NaiveDate,
        _previous_date: Option<NaiveDate>,
    ) -> Result<bool> {
        Ok(self.weather_fetch_enabled && date <= (self.today)())
    }
}
