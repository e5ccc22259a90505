//! Application layer for the diary editor.
//!
//! This crate drives a single diary edit screen: it gates mutations behind user
//! confirmations, keeps the session restart-safe and hands one-shot effects to
//! the view.

pub mod edit;

pub use edit::{DiaryEditOrchestrator, DiaryEditUseCases, EditArgs, EditResult, EditSession};
