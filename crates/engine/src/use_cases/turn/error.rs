//! Turn processing errors.

use airpg_domain::DomainError;

use crate::infrastructure::ports::{LlmError, PersistenceError};

/// The narrator did not produce a usable reply. The turn is aborted and
/// nothing was applied, so the player can simply try again.
#[derive(Debug, thiserror::Error)]
pub enum NarrationFailure {
    #[error("Narrator unavailable: {0}")]
    Oracle(#[from] LlmError),
    #[error("Reply has no ```json block")]
    MissingBlock,
    #[error("Malformed reply: {0}")]
    MalformedReply(String),
    #[error("Invalid inventory change: {0}")]
    InvalidChange(DomainError),
}

impl NarrationFailure {
    pub fn malformed(msg: impl ToString) -> Self {
        Self::MalformedReply(msg.to_string())
    }
}

/// Errors surfaced while handling one line of player input.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Narration(#[from] NarrationFailure),
    #[error("Save failed: {0}")]
    Persistence(#[from] PersistenceError),
}
