//! Port traits for infrastructure boundaries.
//!
//! Everything the game talks to outside its own memory goes through one of
//! these: the narration oracle, the generation/save files, the clock and the
//! dice.

mod error;
mod external;
mod storage;
mod testing;

pub use error::{LlmError, PersistenceError};
pub use external::{
    ChatMessage, FinishReason, LlmPort, LlmRequest, LlmResponse, MessageRole, ResponseFormat,
    TokenUsage,
};
pub use storage::GenerationStore;
pub use testing::{ClockPort, RandomPort};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::MockLlmPort;
#[cfg(test)]
pub use storage::MockGenerationStore;
#[cfg(test)]
pub use testing::MockClockPort;
