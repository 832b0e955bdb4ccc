//! Content generation for a new game.
//!
//! World description from a setting seed, story from the world, starting
//! inventory from the story. Every generation is saved through the
//! [`GenerationStore`] so it can be reused by name in a later game.

use std::sync::Arc;
use std::time::{Duration, Instant};

use airpg_domain::DomainError;

use crate::infrastructure::ports::{
    ChatMessage, GenerationStore, LlmError, LlmPort, LlmRequest, LlmResponse, PersistenceError,
    ResponseFormat,
};
use crate::prompt_templates::PromptTemplates;
use crate::use_cases::session::TokenPricing;
use crate::use_cases::SamplingSettings;

mod inventory;
mod story;
mod world;

pub use inventory::InventoryGenerator;
pub use story::StoryGenerator;
pub use world::WorldGenerator;

/// Errors that can occur while generating content.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Llm(#[from] LlmError),
    #[error("Generated inventory is invalid: {0}")]
    InvalidInventory(DomainError),
    #[error("Failed to save generation: {0}")]
    Persistence(#[from] PersistenceError),
}

/// A generated piece of content and where it was saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated<T> {
    pub value: T,
    /// File name inside the generation store
    pub file_name: String,
    /// Price of the request, when usage and pricing are both known
    pub cost: Option<f64>,
}

/// Collaborators shared by all generators.
#[derive(Clone)]
pub struct GenerationServices {
    llm: Arc<dyn LlmPort>,
    store: Arc<dyn GenerationStore>,
    prompts: Arc<PromptTemplates>,
    sampling: SamplingSettings,
    pricing: Option<TokenPricing>,
}

impl GenerationServices {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        store: Arc<dyn GenerationStore>,
        prompts: Arc<PromptTemplates>,
    ) -> Self {
        Self {
            llm,
            store,
            prompts,
            sampling: SamplingSettings::default(),
            pricing: None,
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingSettings) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_pricing(mut self, pricing: Option<TokenPricing>) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn store(&self) -> &Arc<dyn GenerationStore> {
        &self.store
    }

    pub fn prompts(&self) -> &PromptTemplates {
        &self.prompts
    }

    /// One system prompt + one user message round trip.
    async fn request(
        &self,
        system_prompt: String,
        user_message: &str,
        format: ResponseFormat,
    ) -> Result<(LlmResponse, Duration), LlmError> {
        let request = self
            .sampling
            .apply(LlmRequest::new(vec![ChatMessage::user(user_message)]))
            .with_system_prompt(system_prompt)
            .with_response_format(format);

        let started = Instant::now();
        let response = self.llm.generate(request).await?;
        Ok((response, started.elapsed()))
    }

    /// Log how long a generation took and what it cost; returns the cost.
    fn report(&self, what: &str, response: &LlmResponse, elapsed: Duration) -> Option<f64> {
        let cost = match (self.pricing, response.usage) {
            (Some(pricing), Some(usage)) => Some(pricing.cost(&usage)),
            _ => None,
        };

        match cost {
            Some(cost) => tracing::info!(
                duration_ms = elapsed.as_millis() as u64,
                cost = %format!("${:.8}", cost),
                "Generated {}",
                what
            ),
            None => tracing::info!(
                duration_ms = elapsed.as_millis() as u64,
                "Generated {}",
                what
            ),
        }

        cost
    }
}
