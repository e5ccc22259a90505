//! File-based diary repository.
//!
//! One JSON document per date lives in the diary directory:
//!
//! ```text
//! diaries/
//! ├── 2024-10-01.json
//! ├── 2024-10-02.json
//! └── item_title_history.json
//! images/
//! └── 5f0c....jpg          # attached to a saved diary
//! image_cache/
//! └── 9a1e....jpg          # picked during an edit, moved to images/ on save
//! ```

use crate::storage::AtomicJsonFile;
use async_trait::async_trait;
use chrono::NaiveDate;
use diary_core::config::EditorConfig;
use diary_core::diary::{Diary, DiaryId, DiaryUseCase, ItemTitleSelectionHistory};
use diary_core::error::{DiaryError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const DATE_FILE_FORMAT: &str = "%Y-%m-%d";
const HISTORY_FILE_NAME: &str = "item_title_history.json";
/// Number of item titles kept in the selection history
const MAX_TITLE_HISTORY: usize = 100;

pub struct FileDiaryRepository {
    diary_dir: PathBuf,
    image_dir: PathBuf,
    image_cache_dir: PathBuf,
    /// Serializes writers within this process
    write_lock: Mutex<()>,
}

impl FileDiaryRepository {
    pub fn new(diary_dir: PathBuf, image_dir: PathBuf, image_cache_dir: PathBuf) -> Self {
        Self {
            diary_dir,
            image_dir,
            image_cache_dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &EditorConfig) -> Self {
        Self::new(
            config.diary_dir.clone(),
            config.image_dir.clone(),
            config.image_cache_dir.clone(),
        )
    }

    fn diary_file(&self, date: NaiveDate) -> AtomicJsonFile<Diary> {
        AtomicJsonFile::new(
            self.diary_dir
                .join(format!("{}.json", date.format(DATE_FILE_FORMAT))),
        )
    }

    fn history_file(&self) -> AtomicJsonFile<Vec<ItemTitleSelectionHistory>> {
        AtomicJsonFile::new(self.diary_dir.join(HISTORY_FILE_NAME))
    }

    pub async fn find_by_date(&self, date: NaiveDate) -> Result<Option<Diary>> {
        Ok(self.diary_file(date).load().await?)
    }

    /// Whether a diary is persisted at `date`.
    pub async fn exists_at(&self, date: NaiveDate) -> Result<bool> {
        Ok(fs::try_exists(self.diary_file(date).path()).await?)
    }

    pub async fn find_by_id(&self, id: DiaryId) -> Result<Option<Diary>> {
        for date in self.list_dates().await? {
            if let Some(diary) = self.find_by_date(date).await? {
                if diary.id == id {
                    return Ok(Some(diary));
                }
            }
        }
        Ok(None)
    }

    /// Dates with a persisted diary, oldest first.
    pub async fn list_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut entries = match fs::read_dir(&self.diary_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut dates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if let Ok(date) = NaiveDate::parse_from_str(stem, DATE_FILE_FORMAT) {
                dates.push(date);
            }
        }
        dates.sort();
        Ok(dates)
    }

    /// Previously used item titles, most recent first.
    pub async fn load_title_history(&self) -> Result<Vec<ItemTitleSelectionHistory>> {
        Ok(self.history_file().load().await?.unwrap_or_default())
    }

    async fn merge_title_history(&self, history: &[ItemTitleSelectionHistory]) -> Result<()> {
        if history.is_empty() {
            return Ok(());
        }
        let file = self.history_file();
        let mut merged = file.load().await?.unwrap_or_default();
        merged.retain(|existing| history.iter().all(|entry| entry.title != existing.title));
        merged.extend(history.iter().cloned());
        merged.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        merged.truncate(MAX_TITLE_HISTORY);
        file.save(&merged).await?;
        Ok(())
    }

    /// Moves a freshly picked image from the cache into the image directory.
    async fn promote_image(&self, file_name: &str) -> Result<()> {
        let cached = self.image_cache_dir.join(file_name);
        let target = self.image_dir.join(file_name);

        if !fs::try_exists(&cached).await? {
            if fs::try_exists(&target).await? {
                return Ok(());
            }
            return Err(DiaryError::not_found("image", file_name));
        }

        fs::create_dir_all(&self.image_dir).await?;
        if fs::rename(&cached, &target).await.is_err() {
            // Cache and image directories may live on different filesystems.
            fs::copy(&cached, &target).await?;
            fs::remove_file(&cached).await?;
        }
        tracing::debug!("[FileDiaryRepository] Promoted cached image {}", file_name);
        Ok(())
    }

    async fn remove_image(&self, file_name: &str) -> std::io::Result<()> {
        remove_if_exists(&self.image_dir.join(file_name)).await
    }

    /// Removes an image nobody references any more; failures are only logged.
    async fn discard_image(&self, file_name: &str) {
        if let Err(e) = self.remove_image(file_name).await {
            tracing::warn!(
                "[FileDiaryRepository] Failed to remove unreferenced image {}: {}",
                file_name,
                e
            );
        }
    }
}

#[async_trait]
impl DiaryUseCase for FileDiaryRepository {
    async fn load_diary_by_id(&self, id: DiaryId) -> Result<Diary> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DiaryError::not_found("Diary", id.to_string()))
    }

    async fn load_diary_by_date(&self, date: NaiveDate) -> Result<Diary> {
        self.find_by_date(date)
            .await?
            .ok_or_else(|| DiaryError::not_found("Diary", date.to_string()))
    }

    async fn save_diary(
        &self,
        diary: &Diary,
        history: &[ItemTitleSelectionHistory],
        original_diary: &Diary,
        is_new_diary: bool,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(file_name) = diary.image_file_name.as_deref() {
            if original_diary.image_file_name.as_deref() != Some(file_name) {
                self.promote_image(file_name).await?;
            }
        }

        // Saving onto a date held by another diary replaces that diary.
        let replaced = self
            .find_by_date(diary.date)
            .await?
            .filter(|existing| existing.id != diary.id);

        self.diary_file(diary.date).save(diary).await?;
        tracing::info!(
            "[FileDiaryRepository] Saved diary {} at {}",
            diary.id,
            diary.date
        );

        if !is_new_diary && original_diary.date != diary.date {
            let original_file = self.diary_file(original_diary.date);
            let moved = original_file
                .load()
                .await?
                .is_some_and(|stored| stored.id == original_diary.id);
            if moved {
                original_file.remove().await?;
            }
        }

        if let Some(old) = original_diary.image_file_name.as_deref() {
            if !is_new_diary && diary.image_file_name.as_deref() != Some(old) {
                self.discard_image(old).await;
            }
        }
        if let Some(file_name) = replaced.and_then(|diary| diary.image_file_name) {
            self.discard_image(&file_name).await;
        }

        self.merge_title_history(history).await
    }

    async fn delete_diary(&self, id: DiaryId) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let diary = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DiaryError::not_found("Diary", id.to_string()))?;
        self.diary_file(diary.date).remove().await?;
        tracing::info!("[FileDiaryRepository] Deleted diary {} at {}", id, diary.date);

        if let Some(file_name) = diary.image_file_name {
            if let Err(e) = self.remove_image(&file_name).await {
                return Err(DiaryError::ImageDelete {
                    file_name,
                    message: e.to_string(),
                });
            }
        }
        Ok(())
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "file_diary_repository_test.rs"]
mod tests;
