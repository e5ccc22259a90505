//! Infrastructure layer for the diary editor.
//!
//! File-backed implementations of the `diary-core` traits, configuration loading
//! and logging setup.

pub mod confirmation_policy;
pub mod config_service;
pub mod file_diary_repository;
pub mod image_cache;
pub mod logging;
pub mod paths;
pub mod saved_state;
pub mod storage;

pub use confirmation_policy::RepositoryConfirmationPolicy;
pub use config_service::ConfigService;
pub use file_diary_repository::FileDiaryRepository;
pub use image_cache::FileImageCache;
pub use logging::init_tracing;
pub use paths::{DiaryPaths, PathError};
pub use saved_state::{FileSavedStateStore, InMemorySavedStateStore};
pub use storage::{AtomicJsonError, AtomicJsonFile};
