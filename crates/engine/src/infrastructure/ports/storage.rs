//! Storage port for generated content and saved sessions.

use async_trait::async_trait;

use super::error::PersistenceError;

/// Flat-file store for generations (world, story, inventory) and game saves.
///
/// Save operations pick a timestamped file name from `prefix` and return it,
/// so callers can reference the file later (e.g. in the game config).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Save markdown text as `<prefix><timestamp>.md`.
    async fn save_text(&self, prefix: &str, content: &str) -> Result<String, PersistenceError>;

    /// Save a JSON document as `<prefix><timestamp>.json`.
    async fn save_json(
        &self,
        prefix: &str,
        value: &serde_json::Value,
    ) -> Result<String, PersistenceError>;

    /// Read a text generation by file name.
    async fn read_text(&self, name: &str) -> Result<String, PersistenceError>;

    /// Read a JSON generation by file name.
    async fn read_json(&self, name: &str) -> Result<serde_json::Value, PersistenceError>;
}
