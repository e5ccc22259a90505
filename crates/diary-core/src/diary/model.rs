//! Diary domain model.
//!
//! This module contains the diary entity edited by the edit session, together
//! with the small value types it is built from.

use super::items::DiaryItems;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of a diary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiaryId(Uuid);

impl DiaryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DiaryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DiaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Weather recorded for the day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    #[default]
    Unknown,
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
}

impl Weather {
    pub const ALL: [Weather; 5] = [
        Weather::Unknown,
        Weather::Sunny,
        Weather::Cloudy,
        Weather::Rainy,
        Weather::Snowy,
    ];

    pub fn is_known(self) -> bool {
        self != Weather::Unknown
    }
}

/// How the day felt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    Unknown,
    Happy,
    Good,
    Average,
    Poor,
    Bad,
}

/// A single diary entry.
///
/// Each calendar date holds at most one persisted diary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diary {
    pub id: DiaryId,
    pub date: NaiveDate,
    /// Last time the entry was saved; `None` until the first save
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub weather1: Weather,
    #[serde(default)]
    pub weather2: Weather,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: DiaryItems,
    /// File name of the attached image inside the image directory
    #[serde(default)]
    pub image_file_name: Option<String>,
}

impl Diary {
    /// Creates an empty, not yet persisted diary for `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            id: DiaryId::new(),
            date,
            updated_at: None,
            weather1: Weather::Unknown,
            weather2: Weather::Unknown,
            condition: Condition::Unknown,
            title: String::new(),
            items: DiaryItems::default(),
            image_file_name: None,
        }
    }

    /// Compares user-editable content, ignoring identity and save timestamp.
    pub fn has_same_content(&self, other: &Diary) -> bool {
        self.date == other.date
            && self.weather1 == other.weather1
            && self.weather2 == other.weather2
            && self.condition == other.condition
            && self.title == other.title
            && self.items == other.items
            && self.image_file_name == other.image_file_name
    }
}

/// A previously used item title, offered again when editing items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemTitleSelectionHistory {
    pub id: Uuid,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}
