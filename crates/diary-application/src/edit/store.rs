//! Edit session state container.
//!
//! `EditSessionStore` publishes the current [`EditSession`] through a
//! `tokio::sync::watch` channel and mirrors every change into the injected
//! [`SavedStateStore`] so an interrupted edit can be resumed after a restart.
//! The saved copy records the [`EditArgs`] it belongs to; it is only restored by
//! a screen opened with the same arguments.

use super::args::EditArgs;
use super::session::{EditSession, EditStatus};
use diary_core::state::SavedStateStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, watch};

/// Where the session held by a store came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    /// Read back from the saved state store.
    Restored,
    /// Built from navigation arguments.
    Fresh,
}

/// What is written to the saved state store.
#[derive(Serialize, Deserialize)]
struct SavedSession {
    args: EditArgs,
    session: EditSession,
}

/// Single-writer container for the edit session.
///
/// All writes replace the whole session; readers only ever see complete snapshots.
pub struct EditSessionStore {
    sender: watch::Sender<EditSession>,
    saved_state: Arc<dyn SavedStateStore>,
    key: String,
    args: EditArgs,
    /// Serializes writes to the saved state store
    persist_lock: Mutex<()>,
    discarded: AtomicBool,
}

impl EditSessionStore {
    /// Restores the session saved under `key` for `args`, or builds one with `fresh`.
    ///
    /// A saved value that cannot be read or decoded is logged and ignored. One left
    /// behind by a screen opened with other arguments is dropped.
    pub async fn open(
        saved_state: Arc<dyn SavedStateStore>,
        key: impl Into<String>,
        args: EditArgs,
        fresh: impl FnOnce() -> EditSession,
    ) -> (Self, SessionOrigin) {
        let key = key.into();

        let restored = match saved_state.load(&key).await {
            Ok(Some(json)) => match serde_json::from_str::<SavedSession>(&json) {
                Ok(saved) if saved.args == args => Some(saved.session.restored()),
                Ok(saved) => {
                    tracing::info!(
                        "[EditSessionStore] Dropping saved session of another screen (id={:?}, date={})",
                        saved.args.diary_id,
                        saved.args.diary_date
                    );
                    None
                }
                Err(e) => {
                    tracing::warn!("[EditSessionStore] Ignoring undecodable saved session: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("[EditSessionStore] Failed to read saved session: {}", e);
                None
            }
        };

        let (session, origin) = match restored {
            Some(session) => {
                tracing::info!(
                    "[EditSessionStore] Restored session for {} (status={:?})",
                    session.editing_diary().date,
                    session.status()
                );
                (session, SessionOrigin::Restored)
            }
            None => (fresh(), SessionOrigin::Fresh),
        };

        let (sender, _) = watch::channel(session);
        let store = Self {
            sender,
            saved_state,
            key,
            args,
            persist_lock: Mutex::new(()),
            discarded: AtomicBool::new(false),
        };
        store.persist().await;
        (store, origin)
    }

    /// Returns a copy of the current session.
    pub fn snapshot(&self) -> EditSession {
        self.sender.borrow().clone()
    }

    /// Subscribes to session changes. The receiver always holds the latest value.
    pub fn subscribe(&self) -> watch::Receiver<EditSession> {
        self.sender.subscribe()
    }

    /// Replaces the session with `update(current)`.
    pub async fn update(&self, update: impl FnOnce(EditSession) -> EditSession) -> EditSession {
        let mut next = None;
        self.sender.send_modify(|current| {
            let updated = update(current.clone());
            *current = updated.clone();
            next = Some(updated);
        });
        self.persist().await;
        next.unwrap_or_else(|| self.snapshot())
    }

    pub async fn replace(&self, session: EditSession) {
        self.sender.send_replace(session);
        self.persist().await;
    }

    /// Applies the readiness guard and, when it passes, switches to `status`.
    ///
    /// The check and the transition happen under the channel's write lock, so two
    /// concurrent callers cannot both pass. Returns the session as it was before the
    /// transition.
    pub async fn try_begin(&self, status: EditStatus) -> Option<EditSession> {
        let mut before = None;
        self.sender.send_if_modified(|current| {
            if !current.is_ready() {
                return false;
            }
            before = Some(current.clone());
            *current = current.clone().with_status(status);
            true
        });
        if before.is_some() {
            self.persist().await;
        }
        before
    }

    /// Applies `edit` only when the readiness guard passes.
    pub async fn edit_if_ready(&self, edit: impl FnOnce(EditSession) -> EditSession) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if !current.is_ready() {
                return false;
            }
            let updated = edit(current.clone());
            if updated == *current {
                return false;
            }
            *current = updated;
            true
        });
        if changed {
            self.persist().await;
        }
        changed
    }

    /// Returns a session stuck in `Processing` to `Idle`.
    pub async fn settle(&self) {
        let changed = self.sender.send_if_modified(|current| {
            if current.status() != EditStatus::Processing {
                return false;
            }
            *current = current.clone().with_status(EditStatus::Idle);
            true
        });
        if changed {
            tracing::debug!("[EditSessionStore] Settled processing session back to idle");
            self.persist().await;
        }
    }

    /// Drops the saved copy; the screen is being left for good.
    ///
    /// Later updates are still published but no longer persisted.
    pub async fn discard(&self) {
        self.discarded.store(true, Ordering::SeqCst);
        let _guard = self.persist_lock.lock().await;
        if let Err(e) = self.saved_state.remove(&self.key).await {
            tracing::warn!("[EditSessionStore] Failed to remove saved session: {}", e);
        }
    }

    /// Mirrors the latest session into the saved state store.
    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;
        if self.discarded.load(Ordering::SeqCst) {
            return;
        }
        // Serialize whatever is current now so out-of-order callers never
        // leave an older session behind.
        let saved = SavedSession {
            args: self.args.clone(),
            session: self.sender.borrow().clone(),
        };
        let json = match serde_json::to_string(&saved) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("[EditSessionStore] Failed to serialize session: {}", e);
                return;
            }
        };
        if let Err(e) = self.saved_state.store(&self.key, json).await {
            tracing::warn!("[EditSessionStore] Failed to save session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::args::LaunchSource;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use diary_core::error::Result;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStore {
        values: std::sync::Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl SavedStateStore for MemoryStore {
        async fn load(&self, key: &str) -> Result<Option<String>> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        async fn store(&self, key: &str, value: String) -> Result<()> {
            self.values.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn args(day: u32) -> EditArgs {
        EditArgs::new_diary("edit_result", date(day), LaunchSource::Calendar)
    }

    #[tokio::test]
    async fn test_open_fresh_persists_initial_session() {
        let saved = Arc::new(MemoryStore::default());
        let (store, origin) =
            EditSessionStore::open(saved.clone(), "edit", args(1), || EditSession::new_diary(date(1))).await;

        assert_eq!(origin, SessionOrigin::Fresh);
        let json = saved.load("edit").await.unwrap().unwrap();
        let persisted: SavedSession = serde_json::from_str(&json).unwrap();
        assert_eq!(persisted.args, args(1));
        assert_eq!(persisted.session, store.snapshot());
    }

    #[tokio::test]
    async fn test_reopen_restores_and_resets_processing() {
        let saved = Arc::new(MemoryStore::default());
        {
            let (store, _) =
                EditSessionStore::open(saved.clone(), "edit", args(1), || EditSession::new_diary(date(1))).await;
            store
                .update(|s| s.with_editing(|d| d.title = "kept".to_string()))
                .await;
            assert!(store.try_begin(EditStatus::Processing).await.is_some());
        }

        let (store, origin) =
            EditSessionStore::open(saved, "edit", args(1), || panic!("fresh session must not be built")).await;

        assert_eq!(origin, SessionOrigin::Restored);
        let session = store.snapshot();
        assert_eq!(session.status(), EditStatus::Idle);
        assert_eq!(session.editing_diary().title, "kept");
    }

    #[tokio::test]
    async fn test_undecodable_saved_value_falls_back_to_fresh() {
        let saved = Arc::new(MemoryStore::default());
        saved.store("edit", "not json".to_string()).await.unwrap();

        let (_, origin) =
            EditSessionStore::open(saved, "edit", args(1), || EditSession::new_diary(date(1))).await;

        assert_eq!(origin, SessionOrigin::Fresh);
    }

    #[tokio::test]
    async fn test_try_begin_admits_only_one_caller() {
        let saved = Arc::new(MemoryStore::default());
        let (store, _) =
            EditSessionStore::open(saved, "edit", args(1), || EditSession::new_diary(date(1))).await;

        let first = store.try_begin(EditStatus::Processing).await;
        let second = store.try_begin(EditStatus::Processing).await;

        assert_eq!(first.map(|s| s.status()), Some(EditStatus::Idle));
        assert!(second.is_none());
        assert!(store.snapshot().is_processing());
    }

    #[tokio::test]
    async fn test_edit_if_ready_is_noop_while_processing() {
        let saved = Arc::new(MemoryStore::default());
        let (store, _) =
            EditSessionStore::open(saved, "edit", args(1), || EditSession::new_diary(date(1))).await;
        store.try_begin(EditStatus::Processing).await;
        let before = store.snapshot();

        let changed = store
            .edit_if_ready(|s| s.with_editing(|d| d.title = "ignored".to_string()))
            .await;

        assert!(!changed);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_subscribers_see_whole_replacements() {
        let saved = Arc::new(MemoryStore::default());
        let (store, _) =
            EditSessionStore::open(saved, "edit", args(1), || EditSession::new_diary(date(1))).await;
        let mut receiver = store.subscribe();

        store.update(|s| s.with_date(date(2))).await;

        receiver.changed().await.unwrap();
        let seen = receiver.borrow_and_update().clone();
        assert_eq!(seen.editing_diary().date, date(2));
        assert_eq!(seen.previous_selected_date(), Some(date(1)));
    }

    #[tokio::test]
    async fn test_discard_removes_and_stops_persisting() {
        let saved = Arc::new(MemoryStore::default());
        let (store, _) =
            EditSessionStore::open(saved.clone(), "edit", args(1), || EditSession::new_diary(date(1))).await;

        store.discard().await;
        store.update(|s| s.with_date(date(9))).await;

        assert!(saved.load("edit").await.unwrap().is_none());
        assert_eq!(store.snapshot().editing_diary().date, date(9));
    }

    #[tokio::test]
    async fn test_session_saved_for_other_args_is_not_restored() {
        let saved = Arc::new(MemoryStore::default());
        {
            let (store, _) =
                EditSessionStore::open(saved.clone(), "edit", args(1), || EditSession::new_diary(date(1)))
                    .await;
            store
                .update(|s| s.with_editing(|d| d.title = "draft of the 1st".to_string()))
                .await;
        }

        let (store, origin) =
            EditSessionStore::open(saved.clone(), "edit", args(9), || EditSession::new_diary(date(9)))
                .await;

        assert_eq!(origin, SessionOrigin::Fresh);
        assert_eq!(store.snapshot().editing_diary().date, date(9));
        assert_eq!(store.snapshot().editing_diary().title, "");
        let json = saved.load("edit").await.unwrap().unwrap();
        let persisted: SavedSession = serde_json::from_str(&json).unwrap();
        assert_eq!(persisted.args, args(9));
    }
}
