//! Ordered item slots of a diary entry.
//!
//! A diary carries up to [`MAX_ITEMS`] item slots. Occupied slots always form a
//! contiguous prefix starting at slot 1, and slot 1 is never removed from the
//! visible count.

use super::model::ItemTitleSelectionHistory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Maximum number of item slots a diary can hold.
pub const MAX_ITEMS: usize = 5;

/// Errors raised by slot list operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSlotError {
    /// All slots are already occupied
    #[error("All item slots are occupied")]
    Full,

    /// Item number outside 1..=MAX_ITEMS
    #[error("Item number {0} is out of range")]
    OutOfRange(u8),

    /// The slot exists but is not part of the visible prefix
    #[error("Item {0} is not visible")]
    NotVisible(ItemNumber),
}

/// 1-based position of an item slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ItemNumber(u8);

impl ItemNumber {
    pub const FIRST: ItemNumber = ItemNumber(1);

    /// Creates an item number, rejecting values outside 1..=MAX_ITEMS.
    pub fn new(value: u8) -> Result<Self, ItemSlotError> {
        if value == 0 || usize::from(value) > MAX_ITEMS {
            return Err(ItemSlotError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    fn index(self) -> usize {
        usize::from(self.0) - 1
    }

    fn from_index(index: usize) -> Self {
        // index is always < MAX_ITEMS at call sites
        Self(index as u8 + 1)
    }
}

impl TryFrom<u8> for ItemNumber {
    type Error = ItemSlotError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemNumber> for u8 {
    fn from(number: ItemNumber) -> Self {
        number.0
    }
}

impl fmt::Display for ItemNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One item slot: a title and a comment.
///
/// A slot is occupied when its title is present; an empty string counts as present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryItem {
    pub title: Option<String>,
    pub comment: Option<String>,
    /// Selection history entry the title was picked from, if any
    #[serde(default)]
    pub selection_history_id: Option<Uuid>,
    #[serde(default)]
    pub title_updated_at: Option<DateTime<Utc>>,
}

impl DiaryItem {
    /// An occupied slot with empty title and comment.
    pub fn blank() -> Self {
        Self {
            title: Some(String::new()),
            comment: Some(String::new()),
            selection_history_id: None,
            title_updated_at: None,
        }
    }

    pub fn new(title: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            comment: Some(comment.into()),
            selection_history_id: None,
            title_updated_at: None,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.title.is_some()
    }
}

/// The fixed-size slot map of a diary entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredSlots")]
pub struct DiaryItems {
    slots: [DiaryItem; MAX_ITEMS],
}

/// Slots as read from storage, before the prefix invariant is restored.
#[derive(Deserialize)]
struct StoredSlots {
    slots: [DiaryItem; MAX_ITEMS],
}

impl From<StoredSlots> for DiaryItems {
    /// Closes gaps left in stored slots; an all-empty list gets its blank first slot back.
    fn from(stored: StoredSlots) -> Self {
        Self::from_items(stored.slots.into_iter().filter(DiaryItem::is_occupied))
    }
}

impl Default for DiaryItems {
    /// Slot 1 occupied with blanks, the rest empty.
    fn default() -> Self {
        let mut slots: [DiaryItem; MAX_ITEMS] = Default::default();
        slots[0] = DiaryItem::blank();
        Self { slots }
    }
}

impl DiaryItems {
    /// Builds a slot map from the given items, filling slots from 1 upward.
    ///
    /// Extra entries beyond [`MAX_ITEMS`] are ignored. An empty input yields the default
    /// single blank slot.
    pub fn from_items(items: impl IntoIterator<Item = DiaryItem>) -> Self {
        let mut result = Self::default();
        for (index, item) in items.into_iter().take(MAX_ITEMS).enumerate() {
            result.slots[index] = item;
        }
        result
    }

    /// Length of the contiguous occupied prefix.
    pub fn num_visible(&self) -> usize {
        self.slots
            .iter()
            .take_while(|slot| slot.is_occupied())
            .count()
    }

    /// Returns true when no occupied slot exists after the first unoccupied one.
    pub fn is_contiguous(&self) -> bool {
        let visible = self.num_visible();
        self.slots[visible..].iter().all(|slot| !slot.is_occupied())
    }

    pub fn can_append(&self) -> bool {
        self.num_visible() < MAX_ITEMS
    }

    pub fn get(&self, number: ItemNumber) -> &DiaryItem {
        &self.slots[number.index()]
    }

    /// Iterates over the visible slots with their numbers.
    pub fn visible(&self) -> impl Iterator<Item = (ItemNumber, &DiaryItem)> {
        self.slots
            .iter()
            .take(self.num_visible())
            .enumerate()
            .map(|(index, item)| (ItemNumber::from_index(index), item))
    }

    /// Occupies the next free slot with a blank item.
    pub fn append(&mut self) -> Result<ItemNumber, ItemSlotError> {
        let visible = self.num_visible();
        if visible >= MAX_ITEMS {
            return Err(ItemSlotError::Full);
        }
        self.slots[visible] = DiaryItem::blank();
        Ok(ItemNumber::from_index(visible))
    }

    /// Removes item `number` and compacts the slots above it down by one.
    ///
    /// When only slot 1 is visible it is reset to a blank item instead of removed.
    pub fn remove(&mut self, number: ItemNumber) -> Result<(), ItemSlotError> {
        let visible = self.ensure_visible(number)?;
        let start = number.index();

        for index in start..visible - 1 {
            self.slots[index] = self.slots[index + 1].clone();
        }
        self.slots[visible - 1] = DiaryItem::default();

        if visible == 1 {
            self.slots[0] = DiaryItem::blank();
        }
        Ok(())
    }

    pub fn set_title(&mut self, number: ItemNumber, title: String) -> Result<(), ItemSlotError> {
        self.ensure_visible(number)?;
        let slot = &mut self.slots[number.index()];
        slot.title = Some(title);
        slot.selection_history_id = None;
        Ok(())
    }

    /// Sets a title picked from the selection history.
    pub fn select_title(
        &mut self,
        number: ItemNumber,
        title: String,
        history_id: Option<Uuid>,
        at: DateTime<Utc>,
    ) -> Result<(), ItemSlotError> {
        self.ensure_visible(number)?;
        let slot = &mut self.slots[number.index()];
        slot.title = Some(title);
        slot.selection_history_id = history_id;
        slot.title_updated_at = Some(at);
        Ok(())
    }

    pub fn set_comment(&mut self, number: ItemNumber, comment: String) -> Result<(), ItemSlotError> {
        self.ensure_visible(number)?;
        self.slots[number.index()].comment = Some(comment);
        Ok(())
    }

    /// Collects the selection history entries for every visible, non-blank title.
    ///
    /// Titles without an explicit selection timestamp are stamped with `now`.
    pub fn title_history(&self, now: DateTime<Utc>) -> Vec<ItemTitleSelectionHistory> {
        self.visible()
            .filter_map(|(_, item)| {
                let title = item.title.as_deref()?.trim();
                if title.is_empty() {
                    return None;
                }
                Some(ItemTitleSelectionHistory {
                    id: item.selection_history_id.unwrap_or_else(Uuid::new_v4),
                    title: title.to_string(),
                    updated_at: item.title_updated_at.unwrap_or(now),
                })
            })
            .collect()
    }

    fn ensure_visible(&self, number: ItemNumber) -> Result<usize, ItemSlotError> {
        let visible = self.num_visible();
        if number.index() >= visible {
            return Err(ItemSlotError::NotVisible(number));
        }
        Ok(visible)
    }
}
