use super::*;
use crate::edit::args::LaunchSource;
use crate::edit::effects::Delivery;
use async_trait::async_trait;
use diary_core::diary::{DiaryItem, DiaryItems};
use diary_core::error::{DiaryError, Result};
use std::collections::HashMap;
use tokio::sync::Notify;

const RESULT_KEY: &str = "diary_edit_result";

#[derive(Default, Clone)]
struct Behaviour {
    load_confirmation: bool,
    update_confirmation: bool,
    fetch_weather: bool,
    weather_confirmation: bool,
    weather: Weather,
    fail_load_check: bool,
    fail_update_check: bool,
    fail_weather_check: bool,
    panic_on_save: bool,
    load_error: Option<DiaryError>,
    date_load_error: Option<DiaryError>,
    weather_error: Option<DiaryError>,
    save_error: Option<DiaryError>,
    delete_error: Option<DiaryError>,
    cache_error: Option<DiaryError>,
}

/// Records every call and answers from `behaviour`.
#[derive(Default)]
struct MockUseCases {
    behaviour: std::sync::Mutex<Behaviour>,
    diaries: std::sync::Mutex<Vec<Diary>>,
    calls: std::sync::Mutex<Vec<&'static str>>,
    saved: std::sync::Mutex<Vec<(Diary, Vec<ItemTitleSelectionHistory>)>>,
    deleted: std::sync::Mutex<Vec<DiaryId>>,
    weather_checks: std::sync::Mutex<Vec<(NaiveDate, Option<NaiveDate>)>>,
    save_gate: std::sync::Mutex<Option<Arc<Notify>>>,
}

impl MockUseCases {
    fn with(behaviour: Behaviour, diaries: Vec<Diary>) -> Arc<Self> {
        Arc::new(Self {
            behaviour: std::sync::Mutex::new(behaviour),
            diaries: std::sync::Mutex::new(diaries),
            ..Default::default()
        })
    }

    fn behaviour(&self) -> Behaviour {
        self.behaviour.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn update(&self, change: impl FnOnce(&mut Behaviour)) {
        change(&mut self.behaviour.lock().unwrap());
    }

    fn count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    fn use_cases(self: &Arc<Self>) -> DiaryEditUseCases {
        DiaryEditUseCases {
            diary: self.clone(),
            confirmation: self.clone(),
            weather: self.clone(),
            image_cache: self.clone(),
        }
    }
}

#[async_trait]
impl DiaryUseCase for MockUseCases {
    async fn load_diary_by_id(&self, id: DiaryId) -> Result<Diary> {
        self.record("load_diary_by_id");
        if let Some(error) = self.behaviour().load_error {
            return Err(error);
        }
        self.diaries
            .lock()
            .unwrap()
            .iter()
            .find(|diary| diary.id == id)
            .cloned()
            .ok_or_else(|| DiaryError::not_found("diary", id.to_string()))
    }

    async fn load_diary_by_date(&self, date: NaiveDate) -> Result<Diary> {
        self.record("load_diary_by_date");
        if let Some(error) = self.behaviour().date_load_error {
            return Err(error);
        }
        self.diaries
            .lock()
            .unwrap()
            .iter()
            .find(|diary| diary.date == date)
            .cloned()
            .ok_or_else(|| DiaryError::not_found("diary", date.to_string()))
    }

    async fn save_diary(
        &self,
        diary: &Diary,
        history: &[ItemTitleSelectionHistory],
        _original_diary: &Diary,
        _is_new_diary: bool,
    ) -> Result<()> {
        self.record("save_diary");
        let gate = self.save_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let behaviour = self.behaviour();
        if behaviour.panic_on_save {
            panic!("disk controller on fire");
        }
        if let Some(error) = behaviour.save_error {
            return Err(error);
        }
        self.saved
            .lock()
            .unwrap()
            .push((diary.clone(), history.to_vec()));
        Ok(())
    }

    async fn delete_diary(&self, id: DiaryId) -> Result<()> {
        self.record("delete_diary");
        if let Some(error) = self.behaviour().delete_error {
            return Err(error);
        }
        self.deleted.lock().unwrap().push(id);
        Ok(())
    }
}

#[async_trait]
impl EditConfirmationPolicy for MockUseCases {
    async fn should_request_load_confirmation(
        &self,
        _date: NaiveDate,
        _previous_date: Option<NaiveDate>,
        _original_date: NaiveDate,
        _is_new_diary: bool,
    ) -> Result<bool> {
        self.record("should_request_load_confirmation");
        let behaviour = self.behaviour();
        if behaviour.fail_load_check {
            return Err(DiaryError::data_access("index unavailable"));
        }
        Ok(behaviour.load_confirmation)
    }

    async fn should_request_update_confirmation(
        &self,
        _date: NaiveDate,
        _original_date: NaiveDate,
        _is_new_diary: bool,
    ) -> Result<bool> {
        self.record("should_request_update_confirmation");
        let behaviour = self.behaviour();
        if behaviour.fail_update_check {
            return Err(DiaryError::data_access("index unavailable"));
        }
        Ok(behaviour.update_confirmation)
    }

    async fn should_request_weather_confirmation(
        &self,
        _date: NaiveDate,
        _previous_date: Option<NaiveDate>,
    ) -> Result<bool> {
        self.record("should_request_weather_confirmation");
        let behaviour = self.behaviour();
        if behaviour.fail_weather_check {
            return Err(DiaryError::data_access("settings unavailable"));
        }
        Ok(behaviour.weather_confirmation)
    }

    async fn should_fetch_weather(
        &self,
        date: NaiveDate,
        previous_date: Option<NaiveDate>,
    ) -> Result<bool> {
        self.record("should_fetch_weather");
        self.weather_checks
            .lock()
            .unwrap()
            .push((date, previous_date));
        Ok(self.behaviour().fetch_weather)
    }
}

#[async_trait]
impl WeatherUseCase for MockUseCases {
    async fn fetch_weather_info(&self, _date: NaiveDate) -> Result<Weather> {
        self.record("fetch_weather_info");
        let behaviour = self.behaviour();
        if let Some(error) = behaviour.weather_error {
            return Err(error);
        }
        Ok(behaviour.weather)
    }
}

#[async_trait]
impl ImageCacheUseCase for MockUseCases {
    async fn cache_image(&self, source: &str) -> Result<String> {
        self.record("cache_image");
        if let Some(error) = self.behaviour().cache_error {
            return Err(error);
        }
        Ok(format!("cached-{}", source))
    }

    async fn clear_image_cache_file(&self) -> Result<()> {
        self.record("clear_image_cache_file");
        Ok(())
    }
}

#[derive(Default)]
struct MemorySavedState {
    values: std::sync::Mutex<HashMap<String, String>>,
}

impl MemorySavedState {
    fn has_session(&self) -> bool {
        self.values
            .lock()
            .unwrap()
            .contains_key(&EditorConfig::default().saved_state_key)
    }
}

#[async_trait]
impl SavedStateStore for MemorySavedState {
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
    NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
}

fn item(number: u8) -> ItemNumber {
    ItemNumber::new(number).unwrap()
}

fn persisted(day: u32, title: &str) -> Diary {
    let mut diary = Diary::new(date(day));
    diary.title = title.to_string();
    diary.updated_at = Some(Utc::now());
    diary
}

async fn open(
    mock: &Arc<MockUseCases>,
    saved_state: &Arc<MemorySavedState>,
    args: EditArgs,
) -> DiaryEditOrchestrator {
    DiaryEditOrchestrator::open(
        args,
        mock.use_cases(),
        saved_state.clone(),
        &EditorConfig::default(),
    )
    .await
}

async fn open_existing(mock: &Arc<MockUseCases>, diary: &Diary) -> DiaryEditOrchestrator {
    let args = EditArgs::existing(RESULT_KEY, diary.id, diary.date, LaunchSource::DiaryShow);
    open(mock, &Arc::new(MemorySavedState::default()), args).await
}

/// Takes and acknowledges everything currently queued.
fn drain<T: Clone + std::fmt::Debug>(subscription: &mut EffectSubscription<T>) -> Vec<Delivery<T>> {
    let mut deliveries = Vec::new();
    while let Some(delivery) = subscription.try_recv() {
        subscription.ack(delivery.id);
        deliveries.push(delivery);
    }
    deliveries
}

fn payloads<T: Clone + std::fmt::Debug>(subscription: &mut EffectSubscription<T>) -> Vec<T> {
    drain(subscription)
        .into_iter()
        .map(|delivery| delivery.payload)
        .collect()
}

fn back(result: EditResult) -> Navigation {
    Navigation::Back {
        result_key: RESULT_KEY.to_string(),
        result,
    }
}

// ============================================================================
// Opening
// ============================================================================

#[tokio::test]
async fn test_new_diary_runs_load_check_then_weather_pipeline() {
    let mock = MockUseCases::with(
        Behaviour {
            fetch_weather: true,
            weather: Weather::Sunny,
            ..Default::default()
        },
        vec![],
    );
    let args = EditArgs::new_diary(RESULT_KEY, date(5), LaunchSource::Calendar);

    let orchestrator = open(&mock, &Arc::new(MemorySavedState::default()), args).await;

    assert_eq!(
        *mock.calls.lock().unwrap(),
        vec![
            "should_request_load_confirmation",
            "should_fetch_weather",
            "should_request_weather_confirmation",
            "fetch_weather_info",
        ]
    );
    let session = orchestrator.session();
    assert_eq!(session.status(), EditStatus::Idle);
    assert!(session.is_new_diary());
    assert_eq!(session.editing_diary().weather1, Weather::Sunny);
}

#[tokio::test]
async fn test_new_diary_on_persisted_date_asks_to_load() {
    let existing = persisted(5, "already written");
    let mock = MockUseCases::with(
        Behaviour {
            load_confirmation: true,
            ..Default::default()
        },
        vec![existing.clone()],
    );
    let args = EditArgs::new_diary(RESULT_KEY, date(5), LaunchSource::Calendar);
    let orchestrator = open(&mock, &Arc::new(MemorySavedState::default()), args).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();

    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::LoadConflictDialog { date: date(5) }]
    );
    assert!(orchestrator.is_pending(PendingOperationKind::LoadConflict));
    assert_eq!(mock.count("should_fetch_weather"), 0);

    orchestrator
        .on_dialog_result(DialogResponse::LoadConflict(DialogResult::Positive(())))
        .await;

    let session = orchestrator.session();
    assert_eq!(session.editing_diary(), &existing);
    assert!(!session.is_new_diary());
}

#[tokio::test]
async fn test_existing_diary_is_loaded_by_id() {
    let diary = persisted(3, "morning walk");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);

    let orchestrator = open_existing(&mock, &diary).await;

    let session = orchestrator.session();
    assert_eq!(session.status(), EditStatus::Idle);
    assert_eq!(session.original_diary(), Some(&diary));
    assert_eq!(session.editing_diary(), &diary);
    assert!(!session.has_unsaved_changes());
}

#[tokio::test]
async fn test_initial_load_failure_blocks_intents_until_leaving() {
    let diary = persisted(3, "unreadable");
    let mock = MockUseCases::with(
        Behaviour {
            load_error: Some(DiaryError::io("corrupted file")),
            ..Default::default()
        },
        vec![diary.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();

    assert_eq!(orchestrator.session().status(), EditStatus::Error);
    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::MessageDialog(EditMessage::InitialLoadFailure)]
    );

    orchestrator.on_title_changed("ignored".to_string()).await;
    orchestrator.on_save_requested().await;
    assert_eq!(mock.count("should_request_update_confirmation"), 0);
    assert_eq!(orchestrator.session().editing_diary().title, "");

    orchestrator
        .on_message_dialog_closed(EditMessage::InitialLoadFailure)
        .await;
    assert_eq!(
        payloads(&mut navigation),
        vec![back(EditResult::Unchanged(date(3)))]
    );
}

#[tokio::test]
async fn test_reopen_restores_unsaved_edits_without_reloading() {
    let diary = persisted(3, "original");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let saved_state = Arc::new(MemorySavedState::default());
    let args = EditArgs::existing(RESULT_KEY, diary.id, diary.date, LaunchSource::DiaryList);

    {
        let orchestrator = open(&mock, &saved_state, args.clone()).await;
        orchestrator.on_title_changed("draft".to_string()).await;
    }
    let orchestrator = open(&mock, &saved_state, args).await;

    assert_eq!(mock.count("load_diary_by_id"), 1);
    let session = orchestrator.session();
    assert_eq!(session.editing_diary().title, "draft");
    assert_eq!(session.original_diary(), Some(&diary));
    assert!(session.has_unsaved_changes());
}

#[tokio::test]
async fn test_saved_session_of_another_diary_is_not_restored() {
    let first = persisted(1, "first");
    let second = persisted(9, "second");
    let mock = MockUseCases::with(Behaviour::default(), vec![first.clone(), second.clone()]);
    let saved_state = Arc::new(MemorySavedState::default());
    {
        let args = EditArgs::existing(RESULT_KEY, first.id, first.date, LaunchSource::DiaryList);
        let orchestrator = open(&mock, &saved_state, args).await;
        orchestrator.on_title_changed("draft of first".to_string()).await;
    }

    let args = EditArgs::existing(RESULT_KEY, second.id, second.date, LaunchSource::DiaryList);
    let orchestrator = open(&mock, &saved_state, args).await;

    assert_eq!(mock.count("load_diary_by_id"), 2);
    let session = orchestrator.session();
    assert_eq!(session.editing_diary(), &second);
    assert_eq!(session.original_diary(), Some(&second));
    assert!(!session.has_unsaved_changes());

    orchestrator.on_save_requested().await;
    let saved = mock.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0.id, second.id);
    assert_eq!(saved[0].0.title, "second");
}

#[tokio::test]
async fn test_new_diary_ignores_saved_session_of_existing_diary() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let saved_state = Arc::new(MemorySavedState::default());
    {
        let args = EditArgs::existing(RESULT_KEY, diary.id, diary.date, LaunchSource::DiaryList);
        let orchestrator = open(&mock, &saved_state, args).await;
        orchestrator.on_title_changed("draft".to_string()).await;
    }

    let args = EditArgs::new_diary(RESULT_KEY, date(4), LaunchSource::Calendar);
    let orchestrator = open(&mock, &saved_state, args).await;

    let session = orchestrator.session();
    assert!(session.is_new_diary());
    assert_eq!(session.editing_diary().date, date(4));
    assert_eq!(session.editing_diary().title, "");
    assert_ne!(session.editing_diary().id, diary.id);
}

// ============================================================================
// Date change
// ============================================================================

#[tokio::test]
async fn test_date_change_conflict_positive_loads_persisted_diary() {
    let diary = persisted(1, "first");
    let other = persisted(2, "second");
    let mock = MockUseCases::with(
        Behaviour {
            load_confirmation: true,
            ..Default::default()
        },
        vec![diary.clone(), other.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();
    orchestrator.on_title_changed("draft".to_string()).await;

    orchestrator.on_date_changed(date(2)).await;

    let deliveries = drain(&mut navigation);
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].payload, Navigation::LoadConflictDialog { date: date(2) });
    assert_eq!(deliveries[0].policy, DeliveryPolicy::Retry);
    assert_eq!(orchestrator.session().status(), EditStatus::Idle);
    assert_eq!(orchestrator.session().previous_selected_date(), Some(date(1)));

    orchestrator
        .on_dialog_result(DialogResponse::LoadConflict(DialogResult::Positive(())))
        .await;

    let session = orchestrator.session();
    assert_eq!(session.editing_diary(), &other);
    assert_eq!(session.original_diary(), Some(&other));
    assert!(!orchestrator.is_pending(PendingOperationKind::LoadConflict));
}

#[tokio::test]
async fn test_date_change_conflict_negative_keeps_edits_and_runs_weather() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(
        Behaviour {
            load_confirmation: true,
            ..Default::default()
        },
        vec![diary.clone(), persisted(2, "second")],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    orchestrator.on_title_changed("draft".to_string()).await;
    orchestrator.on_date_changed(date(2)).await;

    orchestrator
        .on_dialog_result(DialogResponse::LoadConflict(DialogResult::Negative))
        .await;

    let session = orchestrator.session();
    assert_eq!(session.editing_diary().title, "draft");
    assert_eq!(session.editing_diary().date, date(2));
    assert_eq!(mock.count("load_diary_by_date"), 0);
    assert_eq!(
        *mock.weather_checks.lock().unwrap(),
        vec![(date(2), Some(date(1)))]
    );
}

#[tokio::test]
async fn test_date_picker_result_changes_date() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();

    orchestrator.on_date_field_clicked().await;
    let deliveries = drain(&mut navigation);
    assert_eq!(deliveries[0].payload, Navigation::DatePicker { date: date(1) });
    assert_eq!(deliveries[0].policy, DeliveryPolicy::Retry);

    orchestrator
        .on_dialog_result(DialogResponse::DatePicker(DialogResult::Positive(date(4))))
        .await;

    assert_eq!(orchestrator.session().editing_diary().date, date(4));
    assert_eq!(mock.count("should_request_load_confirmation"), 1);
}

#[tokio::test]
async fn test_date_picker_and_weather_confirmation_are_staged_together() {
    let mock = MockUseCases::with(
        Behaviour {
            fetch_weather: true,
            weather_confirmation: true,
            weather: Weather::Rainy,
            ..Default::default()
        },
        vec![],
    );
    let args = EditArgs::new_diary(RESULT_KEY, date(6), LaunchSource::Calendar);
    let orchestrator = open(&mock, &Arc::new(MemorySavedState::default()), args).await;

    orchestrator.on_date_field_clicked().await;

    assert!(orchestrator.is_pending(PendingOperationKind::WeatherFetch));
    assert!(orchestrator.is_pending(PendingOperationKind::DateChange));

    orchestrator
        .on_dialog_result(DialogResponse::WeatherFetch(DialogResult::Positive(())))
        .await;
    assert_eq!(orchestrator.session().editing_diary().weather1, Weather::Rainy);
    assert!(orchestrator.is_pending(PendingOperationKind::DateChange));

    orchestrator
        .on_dialog_result(DialogResponse::DatePicker(DialogResult::Cancel))
        .await;
    assert!(!orchestrator.is_pending(PendingOperationKind::DateChange));
    assert_eq!(orchestrator.session().editing_diary().date, date(6));
}

#[tokio::test]
async fn test_load_check_failure_returns_to_idle_with_one_message() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(
        Behaviour {
            fail_load_check: true,
            ..Default::default()
        },
        vec![diary.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();

    orchestrator.on_date_changed(date(2)).await;

    assert_eq!(orchestrator.session().status(), EditStatus::Idle);
    assert_eq!(mock.count("should_fetch_weather"), 0);
    assert!(!orchestrator.is_pending(PendingOperationKind::LoadConflict));
    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::MessageDialog(EditMessage::ConfirmationCheckFailure {
            operation: ConfirmationOperation::Load,
        })]
    );
}

#[tokio::test]
async fn test_weather_check_failure_returns_to_idle_with_one_message() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(
        Behaviour {
            fetch_weather: true,
            fail_weather_check: true,
            ..Default::default()
        },
        vec![diary.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();

    orchestrator.on_date_changed(date(2)).await;

    assert_eq!(orchestrator.session().status(), EditStatus::Idle);
    assert_eq!(mock.count("fetch_weather_info"), 0);
    assert!(!orchestrator.is_pending(PendingOperationKind::WeatherFetch));
    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::MessageDialog(EditMessage::ConfirmationCheckFailure {
            operation: ConfirmationOperation::Weather,
        })]
    );
}

#[tokio::test]
async fn test_weather_fetch_failure_keeps_entered_weather() {
    let mut diary = persisted(1, "first");
    diary.weather1 = Weather::Cloudy;
    let mock = MockUseCases::with(
        Behaviour {
            fetch_weather: true,
            weather_error: Some(DiaryError::Network("offline".to_string())),
            ..Default::default()
        },
        vec![diary.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();

    orchestrator.on_date_changed(date(2)).await;

    let session = orchestrator.session();
    assert_eq!(session.status(), EditStatus::Idle);
    assert_eq!(session.editing_diary().weather1, Weather::Cloudy);
    assert_eq!(mock.count("fetch_weather_info"), 1);
    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::MessageDialog(EditMessage::WeatherFetchFailure)]
    );
}

#[tokio::test]
async fn test_failed_conflict_load_reverts_and_offers_retry() {
    let diary = persisted(1, "first");
    let other = persisted(2, "second");
    let mock = MockUseCases::with(
        Behaviour {
            load_confirmation: true,
            date_load_error: Some(DiaryError::io("locked")),
            ..Default::default()
        },
        vec![diary.clone(), other.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();
    orchestrator.on_title_changed("draft".to_string()).await;
    orchestrator.on_date_changed(date(2)).await;
    drain(&mut navigation);
    let before = orchestrator.session();

    orchestrator
        .on_dialog_result(DialogResponse::LoadConflict(DialogResult::Positive(())))
        .await;

    assert_eq!(orchestrator.session(), before);
    assert_eq!(orchestrator.session().status(), EditStatus::Idle);
    assert!(orchestrator.is_pending(PendingOperationKind::LoadRetry));
    let deliveries = drain(&mut navigation);
    assert_eq!(deliveries.len(), 1);
    assert_eq!(
        deliveries[0].payload,
        Navigation::MessageDialog(EditMessage::LoadFailure { date: date(2) })
    );
    assert_eq!(deliveries[0].policy, DeliveryPolicy::Retry);

    mock.update(|behaviour| behaviour.date_load_error = None);
    orchestrator
        .on_dialog_result(DialogResponse::LoadRetry(DialogResult::Positive(())))
        .await;

    assert_eq!(mock.count("load_diary_by_date"), 2);
    let session = orchestrator.session();
    assert_eq!(session.editing_diary(), &other);
    assert_eq!(session.original_diary(), Some(&other));
    assert!(!orchestrator.is_pending(PendingOperationKind::LoadRetry));
}

#[tokio::test]
async fn test_discarding_failed_load_keeps_edits() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(
        Behaviour {
            load_confirmation: true,
            date_load_error: Some(DiaryError::io("locked")),
            ..Default::default()
        },
        vec![diary.clone(), persisted(2, "second")],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    orchestrator.on_title_changed("draft".to_string()).await;
    orchestrator.on_date_changed(date(2)).await;
    orchestrator
        .on_dialog_result(DialogResponse::LoadConflict(DialogResult::Positive(())))
        .await;

    orchestrator
        .on_dialog_result(DialogResponse::LoadRetry(DialogResult::Negative))
        .await;

    assert_eq!(mock.count("load_diary_by_date"), 1);
    assert!(!orchestrator.is_pending(PendingOperationKind::LoadRetry));
    let session = orchestrator.session();
    assert_eq!(session.status(), EditStatus::Idle);
    assert_eq!(session.editing_diary().title, "draft");
    assert_eq!(session.original_diary(), Some(&diary));
}

#[tokio::test]
async fn test_closing_load_failure_message_drops_retry() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(
        Behaviour {
            load_confirmation: true,
            date_load_error: Some(DiaryError::io("locked")),
            ..Default::default()
        },
        vec![diary.clone(), persisted(2, "second")],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();
    orchestrator.on_date_changed(date(2)).await;
    orchestrator
        .on_dialog_result(DialogResponse::LoadConflict(DialogResult::Positive(())))
        .await;
    drain(&mut navigation);

    orchestrator
        .on_message_dialog_closed(EditMessage::LoadFailure { date: date(2) })
        .await;

    assert!(!orchestrator.is_pending(PendingOperationKind::LoadRetry));
    assert!(payloads(&mut navigation).is_empty());
}

#[tokio::test]
#[should_panic(expected = "no pending WeatherFetch operation was staged")]
async fn test_dialog_result_without_staged_operation_panics() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let orchestrator = open_existing(&mock, &diary).await;

    orchestrator
        .on_dialog_result(DialogResponse::WeatherFetch(DialogResult::Positive(())))
        .await;
}

// ============================================================================
// Save
// ============================================================================

#[tokio::test]
async fn test_save_without_confirmation_persists_and_leaves() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let saved_state = Arc::new(MemorySavedState::default());
    let args = EditArgs::existing(RESULT_KEY, diary.id, diary.date, LaunchSource::DiaryShow);
    let orchestrator = open(&mock, &saved_state, args).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();
    orchestrator.on_item_title_changed(ItemNumber::FIRST, " Run ".to_string()).await;

    orchestrator.on_save_requested().await;

    let saved = mock.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].0.updated_at >= diary.updated_at);
    assert_eq!(saved[0].1.len(), 1);
    assert_eq!(saved[0].1[0].title, "Run");
    assert_eq!(payloads(&mut navigation), vec![back(EditResult::Saved(date(1)))]);
    assert!(!saved_state.has_session());
}

#[tokio::test]
async fn test_update_confirmation_gates_save() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(
        Behaviour {
            update_confirmation: true,
            ..Default::default()
        },
        vec![diary.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();
    orchestrator.on_title_changed("rewritten".to_string()).await;

    orchestrator.on_save_requested().await;

    assert_eq!(mock.count("save_diary"), 0);
    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::UpdateConflictDialog { date: date(1) }]
    );

    orchestrator
        .on_dialog_result(DialogResponse::UpdateConflict(DialogResult::Positive(())))
        .await;

    let saved = mock.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].0.title, "rewritten");
    assert_eq!(payloads(&mut navigation), vec![back(EditResult::Saved(date(1)))]);
}

#[tokio::test]
async fn test_declined_update_confirmation_keeps_editing() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(
        Behaviour {
            update_confirmation: true,
            ..Default::default()
        },
        vec![diary.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    orchestrator.on_title_changed("rewritten".to_string()).await;
    orchestrator.on_save_requested().await;

    orchestrator
        .on_dialog_result(DialogResponse::UpdateConflict(DialogResult::Negative))
        .await;

    assert_eq!(mock.count("save_diary"), 0);
    assert_eq!(orchestrator.session().editing_diary().title, "rewritten");
    assert_eq!(orchestrator.session().status(), EditStatus::Idle);
}

#[tokio::test]
async fn test_save_storage_exhausted_reverts_and_reports() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(
        Behaviour {
            save_error: Some(DiaryError::StorageExhausted("disk full".to_string())),
            ..Default::default()
        },
        vec![diary.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();
    orchestrator.on_title_changed("unsaved".to_string()).await;
    let before = orchestrator.session();

    orchestrator.on_save_requested().await;

    assert_eq!(orchestrator.session(), before);
    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::MessageDialog(EditMessage::StorageExhausted)]
    );
}

#[tokio::test]
async fn test_update_check_failure_returns_to_idle() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(
        Behaviour {
            fail_update_check: true,
            ..Default::default()
        },
        vec![diary.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();

    orchestrator.on_save_requested().await;

    assert_eq!(mock.count("save_diary"), 0);
    assert_eq!(orchestrator.session().status(), EditStatus::Idle);
    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::MessageDialog(EditMessage::ConfirmationCheckFailure {
            operation: ConfirmationOperation::Update,
        })]
    );
}

#[tokio::test]
async fn test_panicking_use_case_is_reported_as_unknown() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(
        Behaviour {
            panic_on_save: true,
            ..Default::default()
        },
        vec![diary.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();

    orchestrator.on_save_requested().await;

    assert_eq!(orchestrator.session().status(), EditStatus::Idle);
    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::MessageDialog(EditMessage::Unknown {
            cause: "disk controller on fire".to_string(),
        })]
    );
}

#[tokio::test]
async fn test_intents_are_ignored_while_processing() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let gate = Arc::new(Notify::new());
    *mock.save_gate.lock().unwrap() = Some(gate.clone());
    let orchestrator = open_existing(&mock, &diary).await;

    let driver = async {
        while !orchestrator.session().is_processing() {
            tokio::task::yield_now().await;
        }
        let during = orchestrator.session();

        orchestrator.on_title_changed("ignored".to_string()).await;
        orchestrator.on_item_add_clicked().await;
        orchestrator.on_date_changed(date(9)).await;
        orchestrator.on_save_requested().await;
        orchestrator.on_delete_requested().await;
        orchestrator.on_navigate_back().await;

        assert_eq!(orchestrator.session(), during);
        assert!(!orchestrator.is_pending(PendingOperationKind::DeleteConfirm));
        gate.notify_one();
    };
    tokio::join!(orchestrator.on_save_requested(), driver);

    assert_eq!(mock.count("save_diary"), 1);
    assert_eq!(mock.count("should_request_update_confirmation"), 1);
    assert_eq!(orchestrator.session().status(), EditStatus::Idle);
}

// ============================================================================
// Items
// ============================================================================

#[tokio::test]
async fn test_item_removal_runs_in_two_phases() {
    let mut diary = persisted(1, "first");
    diary.items = DiaryItems::from_items([
        DiaryItem::new("T1", "C1"),
        DiaryItem::new("T2", "C2"),
        DiaryItem::new("T3", "C3"),
    ]);
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();
    let mut ui_events = orchestrator.subscribe_ui_events().unwrap();

    orchestrator.on_item_delete_clicked(item(2)).await;
    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::ItemDeleteDialog { item_number: item(2) }]
    );

    orchestrator
        .on_dialog_result(DialogResponse::ItemDelete(DialogResult::Positive(())))
        .await;
    assert_eq!(orchestrator.session().status(), EditStatus::InputDisabled);
    assert_eq!(payloads(&mut ui_events), vec![UiEvent::BeginItemRemoval(item(2))]);

    orchestrator.on_title_changed("ignored".to_string()).await;
    assert_eq!(orchestrator.session().editing_diary().title, "first");

    orchestrator.on_item_removal_transition_completed(item(2)).await;

    let session = orchestrator.session();
    assert_eq!(session.status(), EditStatus::Idle);
    let titles: Vec<_> = session
        .editing_diary()
        .items
        .visible()
        .map(|(_, item)| item.title.clone().unwrap_or_default())
        .collect();
    assert_eq!(titles, vec!["T1", "T3"]);
}

#[tokio::test]
async fn test_unexpected_removal_completion_is_ignored() {
    let mut diary = persisted(1, "first");
    diary.items = DiaryItems::from_items([DiaryItem::new("T1", ""), DiaryItem::new("T2", "")]);
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let orchestrator = open_existing(&mock, &diary).await;

    orchestrator.on_item_removal_transition_completed(item(1)).await;

    assert_eq!(orchestrator.session().editing_diary(), &diary);
}

#[tokio::test]
async fn test_item_append_stops_at_capacity() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let orchestrator = open_existing(&mock, &diary).await;

    for _ in 0..10 {
        orchestrator.on_item_add_clicked().await;
    }

    let session = orchestrator.session();
    assert_eq!(session.num_visible_items(), 5);
    assert!(!session.is_item_addition_enabled());
}

// ============================================================================
// Fields
// ============================================================================

#[tokio::test]
async fn test_weather1_change_resets_conflicting_weather2() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let orchestrator = open_existing(&mock, &diary).await;

    orchestrator.on_weather2_changed(Weather::Rainy).await;
    assert_eq!(orchestrator.session().editing_diary().weather2, Weather::Unknown);

    orchestrator.on_weather1_changed(Weather::Sunny).await;
    orchestrator.on_weather2_changed(Weather::Rainy).await;
    assert_eq!(orchestrator.session().editing_diary().weather2, Weather::Rainy);

    orchestrator.on_weather1_changed(Weather::Rainy).await;
    assert_eq!(orchestrator.session().editing_diary().weather2, Weather::Unknown);

    orchestrator.on_weather2_changed(Weather::Cloudy).await;
    orchestrator.on_weather1_changed(Weather::Unknown).await;
    assert_eq!(orchestrator.session().editing_diary().weather2, Weather::Unknown);
}

#[tokio::test]
async fn test_image_selection_caches_and_attaches() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let orchestrator = open_existing(&mock, &diary).await;
    let mut ui_events = orchestrator.subscribe_ui_events().unwrap();

    orchestrator.on_image_select_requested().await;
    assert_eq!(payloads(&mut ui_events), vec![UiEvent::OpenImagePicker]);

    orchestrator.on_image_selected("photo.jpg".to_string()).await;
    assert_eq!(
        orchestrator.session().editing_diary().image_file_name.as_deref(),
        Some("cached-photo.jpg")
    );

    orchestrator.on_image_removed().await;
    assert_eq!(orchestrator.session().editing_diary().image_file_name, None);
}

#[tokio::test]
async fn test_image_cache_failure_is_reported() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(
        Behaviour {
            cache_error: Some(DiaryError::io("read only")),
            ..Default::default()
        },
        vec![diary.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();

    orchestrator.on_image_selected("photo.jpg".to_string()).await;

    assert_eq!(orchestrator.session().editing_diary(), &diary);
    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::MessageDialog(EditMessage::ImageCacheFailure)]
    );
}

// ============================================================================
// Delete and leaving
// ============================================================================

#[tokio::test]
async fn test_confirmed_delete_leaves_with_deleted_result() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();

    orchestrator.on_delete_requested().await;
    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::DeleteConfirmDialog { date: date(1) }]
    );

    orchestrator
        .on_dialog_result(DialogResponse::DeleteConfirm(DialogResult::Positive(())))
        .await;

    assert_eq!(*mock.deleted.lock().unwrap(), vec![diary.id]);
    assert_eq!(payloads(&mut navigation), vec![back(EditResult::Deleted(date(1)))]);
}

#[tokio::test]
async fn test_image_delete_failure_leaves_after_message() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(
        Behaviour {
            delete_error: Some(DiaryError::ImageDelete {
                file_name: "a.jpg".to_string(),
                message: "busy".to_string(),
            }),
            ..Default::default()
        },
        vec![diary.clone()],
    );
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();
    orchestrator.on_delete_requested().await;
    drain(&mut navigation);

    orchestrator
        .on_dialog_result(DialogResponse::DeleteConfirm(DialogResult::Positive(())))
        .await;

    let message = EditMessage::DeleteFailure {
        target: DeleteTarget::Image,
        date: date(1),
    };
    assert_eq!(
        payloads(&mut navigation),
        vec![Navigation::MessageDialog(message.clone())]
    );

    orchestrator.on_message_dialog_closed(message).await;
    assert_eq!(payloads(&mut navigation), vec![back(EditResult::Deleted(date(1)))]);
}

#[tokio::test]
async fn test_new_diary_cannot_be_deleted() {
    let mock = MockUseCases::with(Behaviour::default(), vec![]);
    let args = EditArgs::new_diary(RESULT_KEY, date(5), LaunchSource::DiaryList);
    let orchestrator = open(&mock, &Arc::new(MemorySavedState::default()), args).await;

    orchestrator.on_delete_requested().await;

    assert!(!orchestrator.is_pending(PendingOperationKind::DeleteConfirm));
}

#[tokio::test]
async fn test_back_without_changes_leaves_immediately() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let orchestrator = open_existing(&mock, &diary).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();

    orchestrator.on_navigate_back().await;

    assert_eq!(payloads(&mut navigation), vec![back(EditResult::Unchanged(date(1)))]);
    assert_eq!(mock.count("clear_image_cache_file"), 0);
}

#[tokio::test]
async fn test_exit_without_save_clears_image_cache() {
    let diary = persisted(1, "first");
    let mock = MockUseCases::with(Behaviour::default(), vec![diary.clone()]);
    let saved_state = Arc::new(MemorySavedState::default());
    let args = EditArgs::existing(RESULT_KEY, diary.id, diary.date, LaunchSource::DiaryShow);
    let orchestrator = open(&mock, &saved_state, args).await;
    let mut navigation = orchestrator.subscribe_navigation().unwrap();
    orchestrator.on_title_changed("draft".to_string()).await;

    orchestrator.on_navigate_back().await;
    assert_eq!(payloads(&mut navigation), vec![Navigation::ExitWithoutSaveDialog]);

    orchestrator
        .on_dialog_result(DialogResponse::ExitWithoutSave(DialogResult::Positive(())))
        .await;

    assert_eq!(mock.count("clear_image_cache_file"), 1);
    assert_eq!(payloads(&mut navigation), vec![back(EditResult::Unchanged(date(1)))]);
    assert!(!saved_state.has_session());
}
