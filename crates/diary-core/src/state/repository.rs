//! Saved state repository trait.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value store that survives process restarts.
///
/// The edit session mirrors itself into this store on every change and reads it
/// back when a screen is rebuilt. Values are opaque serialized strings.
#[async_trait]
pub trait SavedStateStore: Send + Sync {
    /// Reads the value stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn store(&self, key: &str, value: String) -> Result<()>;

    /// Removes the value under `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
