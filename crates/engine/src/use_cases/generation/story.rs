//! Main character and story generation.

use crate::infrastructure::ports::ResponseFormat;
use crate::prompt_templates::keys;

use super::{Generated, GenerationError, GenerationServices};

/// Generates the player's character and story from a world description.
pub struct StoryGenerator {
    services: GenerationServices,
}

impl StoryGenerator {
    pub fn new(services: GenerationServices) -> Self {
        Self { services }
    }

    /// Generate and save as `story_<timestamp>.md`.
    pub async fn generate(
        &self,
        world_description: &str,
    ) -> Result<Generated<String>, GenerationError> {
        tracing::info!("Generating main character and story...");
        let system_prompt = self.services.prompts().get(keys::STORY_GENERATION).to_string();
        let (response, elapsed) = self
            .services
            .request(system_prompt, world_description, ResponseFormat::Text)
            .await?;
        let cost = self.services.report("story", &response, elapsed);

        let file_name = self
            .services
            .store()
            .save_text("story_", &response.content)
            .await?;

        Ok(Generated {
            value: response.content,
            file_name,
            cost,
        })
    }
}
