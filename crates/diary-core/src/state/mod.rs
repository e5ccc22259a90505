//! Restart-survivable state.

mod repository;

pub use repository::SavedStateStore;
