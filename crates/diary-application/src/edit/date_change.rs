//! Decisions taken after the edited date changes.
//!
//! A new date may collide with a diary already persisted at that date, and it may
//! call for fresh weather information. Both questions are answered by the
//! external [`EditConfirmationPolicy`]; this module only sequences them.

use super::pending::{LoadConflict, WeatherFetch};
use chrono::NaiveDate;
use diary_core::diary::EditConfirmationPolicy;
use diary_core::error::Result;
use std::sync::Arc;

/// Outcome of checking a new date for a persisted diary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateChangeOutcome {
    NoConflict,
    /// The user must decide whether to load the diary at the new date.
    Conflict(LoadConflict),
}

/// What the weather pipeline should do for a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeatherDecision {
    Skip,
    FetchNow,
    Confirm(WeatherFetch),
}

pub struct DateChangeResolver {
    policy: Arc<dyn EditConfirmationPolicy>,
}

impl DateChangeResolver {
    pub fn new(policy: Arc<dyn EditConfirmationPolicy>) -> Self {
        Self { policy }
    }

    /// Decides whether moving to `date` conflicts with a persisted diary.
    ///
    /// Returning to the previously visited date never conflicts, and neither does
    /// returning to the loaded date of an existing diary. New diaries are always
    /// checked against storage otherwise.
    pub async fn resolve(
        &self,
        date: NaiveDate,
        previous_date: Option<NaiveDate>,
        original_date: NaiveDate,
        is_new_diary: bool,
    ) -> Result<DateChangeOutcome> {
        if previous_date == Some(date) {
            return Ok(DateChangeOutcome::NoConflict);
        }
        if !is_new_diary && date == original_date {
            return Ok(DateChangeOutcome::NoConflict);
        }

        let should_confirm = self
            .policy
            .should_request_load_confirmation(date, previous_date, original_date, is_new_diary)
            .await?;

        tracing::debug!(
            "[DateChangeResolver] date={} previous={:?} original={} new={} conflict={}",
            date,
            previous_date,
            original_date,
            is_new_diary,
            should_confirm
        );

        if should_confirm {
            Ok(DateChangeOutcome::Conflict(LoadConflict {
                date,
                previous_date,
            }))
        } else {
            Ok(DateChangeOutcome::NoConflict)
        }
    }

    /// Decides whether and how weather should be fetched for `date`.
    pub async fn weather_decision(
        &self,
        date: NaiveDate,
        previous_date: Option<NaiveDate>,
    ) -> Result<WeatherDecision> {
        if !self.policy.should_fetch_weather(date, previous_date).await? {
            return Ok(WeatherDecision::Skip);
        }
        if self
            .policy
            .should_request_weather_confirmation(date, previous_date)
            .await?
        {
            return Ok(WeatherDecision::Confirm(WeatherFetch { date }));
        }
        Ok(WeatherDecision::FetchNow)
    }
}
