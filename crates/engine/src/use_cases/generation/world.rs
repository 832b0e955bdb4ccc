//! World description generation.

use crate::infrastructure::ports::ResponseFormat;
use crate::prompt_templates::keys;

use super::{Generated, GenerationError, GenerationServices};

/// Sent instead of an empty seed so the model still gets a user turn.
const NO_SETTING: &str = "No setting given.";

/// Generates a world description from a free-text setting.
pub struct WorldGenerator {
    services: GenerationServices,
}

impl WorldGenerator {
    pub fn new(services: GenerationServices) -> Self {
        Self { services }
    }

    /// Generate and save as `world_<timestamp>.md`.
    pub async fn generate(&self, setting: &str) -> Result<Generated<String>, GenerationError> {
        let seed = if setting.trim().is_empty() {
            NO_SETTING
        } else {
            setting
        };

        tracing::info!("Generating world description...");
        let system_prompt = self.services.prompts().get(keys::WORLD_GENERATION).to_string();
        let (response, elapsed) = self
            .services
            .request(system_prompt, seed, ResponseFormat::Text)
            .await?;
        let cost = self.services.report("world description", &response, elapsed);

        let file_name = self
            .services
            .store()
            .save_text("world_", &response.content)
            .await?;

        Ok(Generated {
            value: response.content,
            file_name,
            cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{services, usage};
    use super::*;
    use crate::infrastructure::ports::{LlmResponse, MockGenerationStore, MockLlmPort};

    #[tokio::test]
    async fn test_generate_world_saves_markdown() {
        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .withf(|request| {
                request.messages[0].content == "Steampunk Venice"
                    && request.response_format == Some(ResponseFormat::Text)
            })
            .returning(|_| {
                let mut response = LlmResponse::text("# Venezia Meccanica");
                response.usage = Some(usage());
                Ok(response)
            });

        let mut store = MockGenerationStore::new();
        store
            .expect_save_text()
            .withf(|prefix, content| prefix == "world_" && content == "# Venezia Meccanica")
            .times(1)
            .returning(|_, _| Ok("world_2024-11-05_14-30-09.md".to_string()));

        let generated = WorldGenerator::new(services(llm, store))
            .generate("Steampunk Venice")
            .await
            .unwrap();

        assert_eq!(generated.value, "# Venezia Meccanica");
        assert_eq!(generated.file_name, "world_2024-11-05_14-30-09.md");
        // 1000 prompt tokens at 0.01 + 500 completion tokens at 0.02
        assert!((generated.cost.unwrap() - 0.02).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_setting_still_sends_a_message() {
        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .withf(|request| request.messages[0].content == NO_SETTING)
            .returning(|_| Ok(LlmResponse::text("A world.")));

        let mut store = MockGenerationStore::new();
        store
            .expect_save_text()
            .returning(|_, _| Ok("world_x.md".to_string()));

        let generated = WorldGenerator::new(services(llm, store))
            .generate("  ")
            .await
            .unwrap();

        assert_eq!(generated.cost, None);
    }
}
