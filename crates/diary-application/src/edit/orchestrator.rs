//! Confirmation orchestrator for the diary edit screen.
//!
//! `DiaryEditOrchestrator` receives user intents, asks the confirmation policy
//! whether the user must confirm, stages pending operations while dialogs are
//! open, runs the mutation use-cases and publishes the resulting session.
//!
//! Every mutating intent passes the readiness guard of [`EditSession::is_ready`].
//! An intent that arrives while another operation is in flight is dropped.

use super::args::{EditArgs, EditResult};
use super::date_change::{DateChangeOutcome, DateChangeResolver, WeatherDecision};
use super::dialog::{DialogResponse, DialogResult};
use super::effects::{
    ChannelError, DeliveryPolicy, EffectChannel, EffectSubscription, Navigation, UiEvent,
};
use super::message::{ConfirmationOperation, DeleteTarget, EditMessage};
use super::pending::{
    DateChange, DeleteConfirm, ExitWithoutSave, ItemDelete, LoadConflict, LoadRetry,
    PendingOperation, PendingOperationCache, PendingOperationKind, UpdateConflict, WeatherFetch,
};
use super::session::{EditSession, EditStatus};
use super::store::{EditSessionStore, SessionOrigin};
use chrono::{NaiveDate, Utc};
use diary_core::config::EditorConfig;
use diary_core::diary::{
    Condition, Diary, DiaryId, DiaryUseCase, EditConfirmationPolicy, ImageCacheUseCase,
    ItemNumber, ItemTitleSelectionHistory, Weather, WeatherUseCase,
};
use diary_core::state::SavedStateStore;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

const UI_EVENT_CAPACITY: usize = 1;
const NAVIGATION_CAPACITY: usize = 1;

/// External use-cases the orchestrator drives.
#[derive(Clone)]
pub struct DiaryEditUseCases {
    pub diary: Arc<dyn DiaryUseCase>,
    pub confirmation: Arc<dyn EditConfirmationPolicy>,
    pub weather: Arc<dyn WeatherUseCase>,
    pub image_cache: Arc<dyn ImageCacheUseCase>,
}

/// Sequences the intents of one diary edit screen.
pub struct DiaryEditOrchestrator {
    args: EditArgs,
    use_cases: DiaryEditUseCases,
    resolver: DateChangeResolver,
    store: EditSessionStore,
    pending: Mutex<PendingOperationCache>,
    /// Item whose removal transition the view is currently running
    removing_item: Mutex<Option<ItemNumber>>,
    ui_events: EffectChannel<UiEvent>,
    navigation: EffectChannel<Navigation>,
}

impl DiaryEditOrchestrator {
    /// Opens the edit session described by `args`.
    ///
    /// A session saved by an earlier process for the same `args` is restored when
    /// present. Otherwise an existing diary is loaded by id, or a new diary runs its
    /// initial date check.
    pub async fn open(
        args: EditArgs,
        use_cases: DiaryEditUseCases,
        saved_state: Arc<dyn SavedStateStore>,
        config: &EditorConfig,
    ) -> Self {
        let fresh_args = args.clone();
        let (store, origin) = EditSessionStore::open(
            saved_state,
            config.saved_state_key.clone(),
            args.clone(),
            move || match fresh_args.diary_id {
                Some(_) => EditSession::loading(fresh_args.diary_date),
                None => EditSession::new_diary(fresh_args.diary_date),
            },
        )
        .await;

        let orchestrator = Self {
            args,
            resolver: DateChangeResolver::new(Arc::clone(&use_cases.confirmation)),
            use_cases,
            store,
            pending: Mutex::new(PendingOperationCache::new()),
            removing_item: Mutex::new(None),
            ui_events: EffectChannel::new(UI_EVENT_CAPACITY),
            navigation: EffectChannel::new(NAVIGATION_CAPACITY),
        };
        orchestrator.start(origin).await;
        orchestrator
    }

    async fn start(&self, origin: SessionOrigin) {
        let session = self.store.snapshot();
        tracing::info!(
            "[Orchestrator] Opening edit session: date={} id={:?} origin={:?}",
            self.args.diary_date,
            self.args.diary_id,
            origin
        );

        match (self.args.diary_id, session.original_diary().is_some(), origin) {
            (Some(id), false, _) => self.load_initial(id).await,
            (None, true, SessionOrigin::Fresh) => {
                let date = session.editing_diary().date;
                self.run("initial date check", EditStatus::Processing, |_| {
                    self.check_date(date, None, date, true)
                })
                .await;
            }
            _ => {}
        }
    }

    // ============================================================================
    // View surface
    // ============================================================================

    pub fn args(&self) -> &EditArgs {
        &self.args
    }

    /// Current session snapshot.
    pub fn session(&self) -> EditSession {
        self.store.snapshot()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<EditSession> {
        self.store.subscribe()
    }

    pub fn subscribe_ui_events(&self) -> Result<EffectSubscription<UiEvent>, ChannelError> {
        self.ui_events.subscribe()
    }

    pub fn subscribe_navigation(&self) -> Result<EffectSubscription<Navigation>, ChannelError> {
        self.navigation.subscribe()
    }

    /// Whether an operation of `kind` is waiting for a dialog result.
    pub fn is_pending(&self, kind: PendingOperationKind) -> bool {
        self.pending().is_staged(kind)
    }

    // ============================================================================
    // Field edits
    // ============================================================================

    pub async fn on_title_changed(&self, title: String) {
        self.edit("title", |diary| diary.title = title).await;
    }

    pub async fn on_weather1_changed(&self, weather: Weather) {
        self.edit("weather1", |diary| apply_weather1(diary, weather))
            .await;
    }

    pub async fn on_weather2_changed(&self, weather: Weather) {
        self.edit("weather2", |diary| {
            if !diary.weather1.is_known() || (weather.is_known() && weather == diary.weather1) {
                tracing::debug!("[Orchestrator] Rejecting weather2={:?}", weather);
                return;
            }
            diary.weather2 = weather;
        })
        .await;
    }

    pub async fn on_condition_changed(&self, condition: Condition) {
        self.edit("condition", |diary| diary.condition = condition)
            .await;
    }

    pub async fn on_item_title_changed(&self, item: ItemNumber, title: String) {
        self.edit("item title", |diary| {
            if let Err(e) = diary.items.set_title(item, title) {
                tracing::warn!("[Orchestrator] Ignoring item title edit: {}", e);
            }
        })
        .await;
    }

    /// A title was picked from the selection history.
    pub async fn on_item_title_selected(&self, item: ItemNumber, selection: ItemTitleSelectionHistory) {
        self.edit("item title selection", |diary| {
            if let Err(e) =
                diary
                    .items
                    .select_title(item, selection.title, Some(selection.id), Utc::now())
            {
                tracing::warn!("[Orchestrator] Ignoring item title selection: {}", e);
            }
        })
        .await;
    }

    pub async fn on_item_comment_changed(&self, item: ItemNumber, comment: String) {
        self.edit("item comment", |diary| {
            if let Err(e) = diary.items.set_comment(item, comment) {
                tracing::warn!("[Orchestrator] Ignoring item comment edit: {}", e);
            }
        })
        .await;
    }

    pub async fn on_item_add_clicked(&self) {
        self.edit("item append", |diary| match diary.items.append() {
            Ok(item) => tracing::debug!("[Orchestrator] Appended item {}", item),
            Err(e) => tracing::warn!("[Orchestrator] Cannot append item: {}", e),
        })
        .await;
    }

    pub async fn on_image_removed(&self) {
        self.edit("image removal", |diary| diary.image_file_name = None)
            .await;
    }

    // ============================================================================
    // Intents that open dialogs
    // ============================================================================

    pub async fn on_date_field_clicked(&self) {
        let Some(session) = self.ready_snapshot("date picker") else {
            return;
        };
        self.confirm(
            DateChange {
                original_date: session.original_date(),
                is_new_diary: session.is_new_diary(),
            },
            Navigation::DatePicker {
                date: session.editing_diary().date,
            },
        );
    }

    pub async fn on_item_delete_clicked(&self, item: ItemNumber) {
        let Some(session) = self.ready_snapshot("item delete") else {
            return;
        };
        if !session.is_item_visible(item) {
            tracing::warn!("[Orchestrator] Item {} is not visible, nothing to delete", item);
            return;
        }
        self.confirm(
            ItemDelete { item_number: item },
            Navigation::ItemDeleteDialog { item_number: item },
        );
    }

    pub async fn on_delete_requested(&self) {
        let Some(session) = self.ready_snapshot("diary delete") else {
            return;
        };
        if session.is_new_diary() {
            tracing::debug!("[Orchestrator] New diary has nothing to delete");
            return;
        }
        let Some(original) = session.original_diary() else {
            return;
        };
        self.confirm(
            DeleteConfirm {
                id: original.id,
                date: original.date,
            },
            Navigation::DeleteConfirmDialog {
                date: original.date,
            },
        );
    }

    pub async fn on_image_select_requested(&self) {
        if self.ready_snapshot("image picker").is_none() {
            return;
        }
        self.ui_events
            .emit(UiEvent::OpenImagePicker, DeliveryPolicy::Single);
    }

    pub async fn on_navigate_back(&self) {
        let session = self.store.snapshot();
        if session.status() == EditStatus::Error {
            self.leave(EditResult::Unchanged(self.args.diary_date)).await;
            return;
        }
        if !session.is_ready() {
            tracing::debug!("[Orchestrator] Ignoring back navigation while busy");
            return;
        }
        if !session.has_unsaved_changes() {
            self.leave(EditResult::Unchanged(session.original_date()))
                .await;
            return;
        }
        self.confirm(
            ExitWithoutSave {
                original_date: session.original_date(),
            },
            Navigation::ExitWithoutSaveDialog,
        );
    }

    // ============================================================================
    // Mutating intents
    // ============================================================================

    pub async fn on_date_changed(&self, date: NaiveDate) {
        let session = self.store.snapshot();
        self.change_date(date, session.original_date(), session.is_new_diary())
            .await;
    }

    pub async fn on_save_requested(&self) {
        self.run("save", EditStatus::Processing, |before| async move {
            let Some(original) = before.original_diary().cloned() else {
                return;
            };
            let diary = before.editing_diary().clone();
            let is_new_diary = before.is_new_diary();
            let check = self
                .use_cases
                .confirmation
                .should_request_update_confirmation(diary.date, original.date, is_new_diary)
                .await;

            let request = UpdateConflict {
                history: diary.items.title_history(Utc::now()),
                diary,
                original_diary: original,
                is_new_diary,
            };
            match check {
                Ok(true) => {
                    let date = request.diary.date;
                    self.confirm(request, Navigation::UpdateConflictDialog { date });
                }
                Ok(false) => self.save(request, before).await,
                Err(e) => {
                    tracing::warn!("[Orchestrator] Update confirmation check failed: {}", e);
                    self.fail(None, confirmation_failure(ConfirmationOperation::Update))
                        .await;
                }
            }
        })
        .await;
    }

    pub async fn on_image_selected(&self, source: String) {
        self.run("image cache", EditStatus::Processing, |before| async move {
            match self.use_cases.image_cache.cache_image(&source).await {
                Ok(file_name) => {
                    tracing::debug!("[Orchestrator] Cached image as {}", file_name);
                    self.store
                        .update(|s| s.with_editing(|diary| diary.image_file_name = Some(file_name)))
                        .await;
                }
                Err(e) => {
                    tracing::warn!("[Orchestrator] Failed to cache image: {}", e);
                    self.fail(Some(before), EditMessage::ImageCacheFailure).await;
                }
            }
        })
        .await;
    }

    /// The view finished the removal animation of `item`.
    pub async fn on_item_removal_transition_completed(&self, item: ItemNumber) {
        {
            let mut removing = lock(&self.removing_item);
            if *removing != Some(item) {
                tracing::warn!(
                    "[Orchestrator] Ignoring removal completion for item {} (expected {:?})",
                    item,
                    *removing
                );
                return;
            }
            removing.take();
        }

        self.store
            .update(|session| {
                if session.status() != EditStatus::InputDisabled {
                    return session;
                }
                session
                    .with_editing(|diary| {
                        if let Err(e) = diary.items.remove(item) {
                            tracing::warn!("[Orchestrator] Item removal failed: {}", e);
                        }
                    })
                    .with_status(EditStatus::Idle)
            })
            .await;
    }

    /// A confirmation dialog was closed.
    ///
    /// # Panics
    ///
    /// Panics when no operation of the answered kind was staged.
    pub async fn on_dialog_result(&self, response: DialogResponse) {
        tracing::debug!(
            "[Orchestrator] Dialog result for {:?}: {:?}",
            response.kind(),
            response
        );

        match response {
            DialogResponse::LoadConflict(result) => {
                let conflict: LoadConflict = self.pending().consume();
                match result {
                    DialogResult::Positive(()) => {
                        self.run("diary load", EditStatus::Processing, |before| {
                            self.load_at(conflict.date, before)
                        })
                        .await;
                    }
                    DialogResult::Negative => {
                        self.run("weather update", EditStatus::Processing, |_| {
                            self.update_weather(conflict.date, conflict.previous_date)
                        })
                        .await;
                    }
                    DialogResult::Cancel => {}
                }
            }
            DialogResponse::UpdateConflict(result) => {
                let request: UpdateConflict = self.pending().consume();
                if result.is_positive() {
                    self.run("save", EditStatus::Processing, |before| {
                        self.save(request, before)
                    })
                    .await;
                }
            }
            DialogResponse::DeleteConfirm(result) => {
                let request: DeleteConfirm = self.pending().consume();
                if result.is_positive() {
                    self.run("delete", EditStatus::Processing, |before| {
                        self.delete(request, before)
                    })
                    .await;
                }
            }
            DialogResponse::DatePicker(result) => {
                let request: DateChange = self.pending().consume();
                if let DialogResult::Positive(date) = result {
                    self.change_date(date, request.original_date, request.is_new_diary)
                        .await;
                }
            }
            DialogResponse::ItemDelete(result) => {
                let request: ItemDelete = self.pending().consume();
                if result.is_positive() {
                    self.begin_item_removal(request.item_number).await;
                }
            }
            DialogResponse::WeatherFetch(result) => {
                let request: WeatherFetch = self.pending().consume();
                if result.is_positive() {
                    self.run("weather fetch", EditStatus::Processing, |_| {
                        self.fetch_weather(request.date)
                    })
                    .await;
                }
            }
            DialogResponse::ExitWithoutSave(result) => {
                let request: ExitWithoutSave = self.pending().consume();
                if result.is_positive() {
                    self.run("exit without save", EditStatus::Processing, |_| {
                        self.exit_without_save(request)
                    })
                    .await;
                }
            }
            DialogResponse::LoadRetry(result) => {
                let retry: LoadRetry = self.pending().consume();
                if result.is_positive() {
                    self.run("diary load retry", EditStatus::Processing, |before| {
                        self.load_at(retry.date, before)
                    })
                    .await;
                } else {
                    tracing::debug!("[Orchestrator] Discarded failed load of {}", retry.date);
                }
            }
        }
    }

    /// A message dialog was closed.
    pub async fn on_message_dialog_closed(&self, message: EditMessage) {
        match message {
            EditMessage::InitialLoadFailure => {
                self.leave(EditResult::Unchanged(self.args.diary_date)).await;
            }
            EditMessage::DeleteFailure {
                target: DeleteTarget::Image,
                date,
            } => {
                self.leave(EditResult::Deleted(date)).await;
            }
            EditMessage::LoadFailure { date } => {
                // Closed without answering: same as discarding.
                if self.pending().try_consume::<LoadRetry>().is_some() {
                    tracing::debug!("[Orchestrator] Dropped retry of load at {}", date);
                }
            }
            _ => {}
        }
    }

    // ============================================================================
    // Flows
    // ============================================================================

    async fn load_initial(&self, id: DiaryId) {
        self.store
            .update(|s| s.with_status(EditStatus::Loading))
            .await;

        let result = AssertUnwindSafe(self.use_cases.diary.load_diary_by_id(id))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(diary)) => {
                tracing::info!("[Orchestrator] Loaded diary {} ({})", diary.id, diary.date);
                self.store
                    .update(|s| s.with_loaded(diary).with_status(EditStatus::Idle))
                    .await;
            }
            Ok(Err(e)) => {
                tracing::error!("[Orchestrator] Initial load of diary {} failed: {}", id, e);
                self.enter_error().await;
            }
            Err(panic) => {
                tracing::error!(
                    "[Orchestrator] Initial load of diary {} panicked: {}",
                    id,
                    panic_cause(panic.as_ref())
                );
                self.enter_error().await;
            }
        }
    }

    async fn enter_error(&self) {
        self.store
            .update(|s| s.with_status(EditStatus::Error))
            .await;
        self.navigate(
            Navigation::MessageDialog(EditMessage::InitialLoadFailure),
            DeliveryPolicy::Retry,
        );
    }

    async fn change_date(&self, date: NaiveDate, original_date: NaiveDate, is_new_diary: bool) {
        self.run("date change", EditStatus::Processing, |before| async move {
            if before.editing_diary().date == date {
                return;
            }
            let session = self.store.update(|s| s.with_date(date)).await;
            self.check_date(date, session.previous_selected_date(), original_date, is_new_diary)
                .await;
        })
        .await;
    }

    async fn check_date(
        &self,
        date: NaiveDate,
        previous_date: Option<NaiveDate>,
        original_date: NaiveDate,
        is_new_diary: bool,
    ) {
        match self
            .resolver
            .resolve(date, previous_date, original_date, is_new_diary)
            .await
        {
            Ok(DateChangeOutcome::Conflict(conflict)) => {
                self.confirm(conflict, Navigation::LoadConflictDialog { date });
            }
            Ok(DateChangeOutcome::NoConflict) => self.update_weather(date, previous_date).await,
            Err(e) => {
                tracing::warn!("[Orchestrator] Load confirmation check failed: {}", e);
                self.fail(None, confirmation_failure(ConfirmationOperation::Load))
                    .await;
            }
        }
    }

    async fn update_weather(&self, date: NaiveDate, previous_date: Option<NaiveDate>) {
        match self.resolver.weather_decision(date, previous_date).await {
            Ok(WeatherDecision::Skip) => {}
            Ok(WeatherDecision::FetchNow) => self.fetch_weather(date).await,
            Ok(WeatherDecision::Confirm(request)) => {
                self.confirm(request, Navigation::WeatherFetchDialog { date });
            }
            Err(e) => {
                tracing::warn!("[Orchestrator] Weather confirmation check failed: {}", e);
                self.fail(None, confirmation_failure(ConfirmationOperation::Weather))
                    .await;
            }
        }
    }

    async fn fetch_weather(&self, date: NaiveDate) {
        match self.use_cases.weather.fetch_weather_info(date).await {
            Ok(weather) => {
                tracing::debug!("[Orchestrator] Weather for {}: {:?}", date, weather);
                self.store
                    .update(|s| s.with_editing(|diary| apply_weather1(diary, weather)))
                    .await;
            }
            Err(e) => {
                tracing::warn!("[Orchestrator] Weather fetch for {} failed: {}", date, e);
                self.fail(None, EditMessage::WeatherFetchFailure).await;
            }
        }
    }

    async fn load_at(&self, date: NaiveDate, before: EditSession) {
        match self.use_cases.diary.load_diary_by_date(date).await {
            Ok(diary) => {
                tracing::info!("[Orchestrator] Switched to persisted diary at {}", date);
                self.store.update(|s| s.with_loaded(diary)).await;
            }
            Err(e) => {
                tracing::warn!("[Orchestrator] Loading diary at {} failed: {}", date, e);
                self.pending().stage(LoadRetry { date });
                self.fail(Some(before), EditMessage::LoadFailure { date })
                    .await;
            }
        }
    }

    async fn save(&self, request: UpdateConflict, before: EditSession) {
        let mut diary = request.diary;
        diary.updated_at = Some(Utc::now());

        let result = self
            .use_cases
            .diary
            .save_diary(
                &diary,
                &request.history,
                &request.original_diary,
                request.is_new_diary,
            )
            .await;
        match result {
            Ok(()) => {
                tracing::info!("[Orchestrator] Saved diary {} ({})", diary.id, diary.date);
                let date = diary.date;
                self.store
                    .update(|s| s.with_loaded(diary).with_status(EditStatus::Idle))
                    .await;
                self.leave(EditResult::Saved(date)).await;
            }
            Err(e) => {
                tracing::warn!("[Orchestrator] Saving diary failed: {}", e);
                self.fail(Some(before), EditMessage::from_save_error(&e))
                    .await;
            }
        }
    }

    async fn delete(&self, request: DeleteConfirm, before: EditSession) {
        match self.use_cases.diary.delete_diary(request.id).await {
            Ok(()) => {
                tracing::info!("[Orchestrator] Deleted diary {} ({})", request.id, request.date);
                self.store
                    .update(|s| s.with_status(EditStatus::Idle))
                    .await;
                self.leave(EditResult::Deleted(request.date)).await;
            }
            Err(e) => {
                tracing::warn!("[Orchestrator] Deleting diary {} failed: {}", request.id, e);
                let message = EditMessage::from_delete_error(&e, request.date);
                // Once the entry is gone there is nothing left to revert to.
                let revert_to = if message.ends_session() {
                    None
                } else {
                    Some(before)
                };
                self.fail(revert_to, message).await;
            }
        }
    }

    async fn begin_item_removal(&self, item: ItemNumber) {
        let Some(before) = self.store.try_begin(EditStatus::InputDisabled).await else {
            tracing::debug!("[Orchestrator] Ignoring item removal while not ready");
            return;
        };
        if !before.is_item_visible(item) {
            tracing::warn!("[Orchestrator] Item {} vanished before removal", item);
            self.store
                .update(|s| s.with_status(EditStatus::Idle))
                .await;
            return;
        }
        *lock(&self.removing_item) = Some(item);
        self.ui_events
            .emit(UiEvent::BeginItemRemoval(item), DeliveryPolicy::Retry);
    }

    async fn exit_without_save(&self, request: ExitWithoutSave) {
        if let Err(e) = self.use_cases.image_cache.clear_image_cache_file().await {
            tracing::warn!("[Orchestrator] Failed to clear image cache: {}", e);
        }
        self.store
            .update(|s| s.with_status(EditStatus::Idle))
            .await;
        self.leave(EditResult::Unchanged(request.original_date))
            .await;
    }

    // ============================================================================
    // Helpers
    // ============================================================================

    /// Runs `flow` as the single in-flight operation.
    ///
    /// Does nothing when the readiness guard fails. A panic inside `flow` restores the
    /// session as it was before, and the session never stays `Processing` afterwards.
    async fn run<'a, F, Fut>(&'a self, operation: &'static str, status: EditStatus, flow: F)
    where
        F: FnOnce(EditSession) -> Fut,
        Fut: Future<Output = ()> + 'a,
    {
        let Some(before) = self.store.try_begin(status).await else {
            tracing::debug!("[Orchestrator] Ignoring {} while not ready", operation);
            return;
        };
        tracing::debug!("[Orchestrator] Running {}", operation);

        if let Err(panic) = AssertUnwindSafe(flow(before.clone()))
            .catch_unwind()
            .await
        {
            let cause = panic_cause(panic.as_ref());
            tracing::error!("[Orchestrator] {} panicked: {}", operation, cause);
            self.fail(Some(before), EditMessage::Unknown { cause }).await;
        }
        self.store.settle().await;
    }

    /// Applies a field edit when the readiness guard passes.
    async fn edit(&self, field: &'static str, edit: impl FnOnce(&mut Diary)) {
        if !self
            .store
            .edit_if_ready(|session| session.with_editing(edit))
            .await
        {
            tracing::debug!("[Orchestrator] Edit of {} not applied", field);
        }
    }

    fn ready_snapshot(&self, intent: &'static str) -> Option<EditSession> {
        let session = self.store.snapshot();
        if session.is_ready() {
            Some(session)
        } else {
            tracing::debug!("[Orchestrator] Ignoring {} while not ready", intent);
            None
        }
    }

    fn confirm(&self, operation: impl Into<PendingOperation>, dialog: Navigation) {
        let operation = operation.into();
        tracing::debug!("[Orchestrator] Requesting confirmation for {:?}", operation.kind());
        self.pending().stage(operation);
        self.navigate(dialog, DeliveryPolicy::Retry);
    }

    async fn fail(&self, revert_to: Option<EditSession>, message: EditMessage) {
        match revert_to {
            Some(snapshot) => {
                self.store
                    .replace(snapshot.with_status(EditStatus::Idle))
                    .await
            }
            None => {
                self.store
                    .update(|s| s.with_status(EditStatus::Idle))
                    .await;
            }
        }
        self.navigate(Navigation::MessageDialog(message), DeliveryPolicy::Retry);
    }

    /// Leaves the screen for good, dropping the saved session.
    async fn leave(&self, result: EditResult) {
        tracing::info!("[Orchestrator] Leaving edit screen: {:?}", result);
        self.store.discard().await;
        self.navigate(
            Navigation::Back {
                result_key: self.args.result_key.clone(),
                result,
            },
            DeliveryPolicy::Retry,
        );
    }

    fn navigate(&self, navigation: Navigation, policy: DeliveryPolicy) {
        tracing::debug!("[Orchestrator] Navigate ({:?}): {:?}", policy, navigation);
        self.navigation.emit(navigation, policy);
    }

    fn pending(&self) -> MutexGuard<'_, PendingOperationCache> {
        lock(&self.pending)
    }
}

/// Sets weather1, dropping a weather2 that no longer makes sense next to it.
fn apply_weather1(diary: &mut Diary, weather: Weather) {
    diary.weather1 = weather;
    if !weather.is_known() || diary.weather2 == weather {
        diary.weather2 = Weather::Unknown;
    }
}

fn confirmation_failure(operation: ConfirmationOperation) -> EditMessage {
    EditMessage::ConfirmationCheckFailure { operation }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_cause(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|cause| cause.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
