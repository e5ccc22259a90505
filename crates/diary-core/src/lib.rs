//! Domain layer of the diary editor.
//!
//! Holds the diary model, the item slot rules, the error type and the interfaces
//! of every external collaborator the edit session talks to.

pub mod config;
pub mod diary;
pub mod error;
pub mod state;

// Re-export common error type
pub use error::{DiaryError, Result};
