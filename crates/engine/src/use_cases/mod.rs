//! Use cases - User story orchestration.
//!
//! - `turn` - a single player turn against the narrator
//! - `generation` - world, story and starting inventory bootstrap
//! - `session` - a whole game: bootstrap, turns, save and resume

pub mod generation;
pub mod session;
pub mod turn;

pub use generation::{Generated, GenerationError, InventoryGenerator, StoryGenerator, WorldGenerator};
pub use session::{GameSession, SessionError, SessionReply};
pub use turn::{NarrationFailure, TurnError, TurnOutput, TurnProcessor, TurnResult};

use crate::infrastructure::ports::LlmRequest;

/// Sampling parameters applied to every request a use case sends.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SamplingSettings {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl SamplingSettings {
    pub fn apply(&self, request: LlmRequest) -> LlmRequest {
        request
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }
}
