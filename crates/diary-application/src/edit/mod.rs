//! Diary edit session.
//!
//! [`DiaryEditOrchestrator`] owns the session of one edit screen. The view
//! observes [`EditSession`] snapshots, consumes [`UiEvent`]s and
//! [`Navigation`]s, and reports user intents and dialog results back.

mod args;
mod date_change;
mod dialog;
mod effects;
mod message;
mod orchestrator;
mod pending;
mod session;
mod store;

pub use args::{EditArgs, EditResult, LaunchSource};
pub use date_change::{DateChangeOutcome, DateChangeResolver, WeatherDecision};
pub use dialog::{DialogResponse, DialogResult};
pub use effects::{
    ChannelError, Delivery, DeliveryPolicy, EffectChannel, EffectSubscription, Navigation, UiEvent,
};
pub use message::{ConfirmationOperation, DeleteTarget, EditMessage};
pub use orchestrator::{DiaryEditOrchestrator, DiaryEditUseCases};
pub use pending::{
    DateChange, DeleteConfirm, ExitWithoutSave, ItemDelete, LoadConflict, LoadRetry,
    PendingOperation, PendingOperationCache, PendingOperationKind, StagedOperation,
    UpdateConflict, WeatherFetch,
};
pub use session::{EditSession, EditStatus};
pub use store::{EditSessionStore, SessionOrigin};
