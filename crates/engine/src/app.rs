//! Application state and composition.

use std::sync::Arc;

use anyhow::Context;

use airpg_domain::DiceAggregator;

use crate::infrastructure::{
    chat_completions::ChatCompletionsClient,
    clock::{SeededRandom, SystemClock, SystemRandom},
    config::{AppConfig, GameConfig},
    file_store::FileGenerationStore,
    ports::{ClockPort, GenerationStore, LlmPort, RandomPort},
    resilient_llm::ResilientLlmClient,
    transcript::TranscriptLlmClient,
};
use crate::prompt_templates::PromptTemplates;
use crate::use_cases::generation::GenerationServices;
use crate::use_cases::session::{GameSession, SessionError, SessionServices, SessionSetup};
use crate::use_cases::turn::{ReservedCommands, TurnProcessor};
use crate::use_cases::SamplingSettings;

/// Shared ports and configuration for building game sessions.
pub struct App {
    pub config: AppConfig,
    pub game: GameConfig,
    pub llm: Arc<dyn LlmPort>,
    pub store: Arc<dyn GenerationStore>,
    pub prompts: Arc<PromptTemplates>,
    pub clock: Arc<dyn ClockPort>,
    pub random: Arc<dyn RandomPort>,
    dice: DiceAggregator,
}

impl App {
    /// Create the App with production adapters.
    ///
    /// LLM stack: chat completions client, wrapped in retries, wrapped in the
    /// transcript log.
    pub fn new(config: AppConfig, game: GameConfig) -> anyhow::Result<Self> {
        let dice = game.dice().context("Invalid difficulty settings")?;

        let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
        let random: Arc<dyn RandomPort> = match config.dice_seed {
            Some(seed) => {
                tracing::info!(seed, "Using seeded dice");
                Arc::new(SeededRandom::new(seed))
            }
            None => Arc::new(SystemRandom::new()),
        };

        let client = ChatCompletionsClient::with_timeout(
            &config.llm_base_url,
            &config.llm_model,
            config.llm_timeout_secs,
        )
        .with_api_key(config.llm_api_key.clone());
        tracing::info!(
            base_url = %config.llm_base_url,
            model = %config.llm_model,
            max_retries = config.retry.max_retries,
            "LLM client configured"
        );
        let resilient = ResilientLlmClient::new(Arc::new(client), config.retry.clone());
        let transcript = TranscriptLlmClient::new(Arc::new(resilient), &config.logs_dir, clock.clone());
        tracing::info!(path = %transcript.path().display(), "LLM transcript");

        let store: Arc<dyn GenerationStore> =
            Arc::new(FileGenerationStore::new(config.generation_dir(), clock.clone()));
        let prompts = PromptTemplates::load(&config.prompts_dir)
            .context("Failed to load prompt templates")?;

        Ok(Self::with_ports(
            config,
            game,
            dice,
            Arc::new(transcript),
            store,
            Arc::new(prompts),
            clock,
            random,
        ))
    }

    /// Create the App from already built ports.
    #[allow(clippy::too_many_arguments)]
    pub fn with_ports(
        config: AppConfig,
        game: GameConfig,
        dice: DiceAggregator,
        llm: Arc<dyn LlmPort>,
        store: Arc<dyn GenerationStore>,
        prompts: Arc<PromptTemplates>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        Self {
            config,
            game,
            llm,
            store,
            prompts,
            clock,
            random,
            dice,
        }
    }

    pub fn sampling(&self) -> SamplingSettings {
        SamplingSettings {
            temperature: self.config.llm_temperature,
            max_tokens: self.config.llm_max_tokens,
        }
    }

    /// Fresh collaborators for one session.
    pub fn session_services(&self) -> SessionServices {
        let commands = ReservedCommands::new(
            self.game.commands.inventory.clone(),
            self.game.commands.save.clone(),
        );

        SessionServices {
            turns: TurnProcessor::new(
                self.llm.clone(),
                self.random.clone(),
                self.prompts.clone(),
                self.dice.clone(),
            )
            .with_commands(commands)
            .with_sampling(self.sampling()),
            generation: GenerationServices::new(
                self.llm.clone(),
                self.store.clone(),
                self.prompts.clone(),
            )
            .with_sampling(self.sampling())
            .with_pricing(self.config.pricing),
            clock: self.clock.clone(),
            pricing: self.config.pricing,
        }
    }

    pub fn session_setup(&self) -> SessionSetup {
        SessionSetup {
            world: self.game.generation.world.clone(),
            story: self.game.generation.story.clone(),
            starting_inventory: self.game.generation.starting_inventory.clone(),
            dice_legend: self.game.difficulty.dice_legend.clone(),
            language_instructions: self.game.language_instructions(),
        }
    }

    /// Start a new game from the configured generation sources.
    pub async fn new_session(&self) -> Result<GameSession, SessionError> {
        GameSession::bootstrap(self.session_services(), &self.session_setup()).await
    }

    /// Continue a saved game.
    pub async fn resume_session(&self, file_name: &str) -> Result<GameSession, SessionError> {
        GameSession::resume(self.session_services(), &self.session_setup(), file_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::{FixedClock, FixedRandom};
    use crate::infrastructure::ports::{MockGenerationStore, MockLlmPort};
    use chrono::Utc;

    const GAME: &str = r#"
generation:
  world: world_a.md
  story: story_a.md
difficulty:
  number_of_dice: 3
  dice_combine_method: min
  dice_legend: "Low is bad."
language: German
commands:
  inventory: /inv
"#;

    fn app() -> App {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let game = GameConfig::from_str(GAME, config::FileFormat::Yaml).unwrap();
        let dice = game.dice().unwrap();
        App::with_ports(
            config,
            game,
            dice,
            Arc::new(MockLlmPort::new()),
            Arc::new(MockGenerationStore::new()),
            Arc::new(PromptTemplates::defaults()),
            Arc::new(FixedClock(Utc::now())),
            Arc::new(FixedRandom(4)),
        )
    }

    #[test]
    fn test_session_setup_from_game_config() {
        let setup = app().session_setup();

        assert_eq!(setup.world.as_deref(), Some("world_a.md"));
        assert_eq!(setup.story.as_deref(), Some("story_a.md"));
        assert_eq!(setup.starting_inventory, None);
        assert_eq!(setup.dice_legend, "Low is bad.");
        assert_eq!(setup.language_instructions, "- Respond in German");
    }

    #[test]
    fn test_session_services_use_configured_commands_and_dice() {
        let services = app().session_services();

        assert_eq!(services.turns.commands().inventory(), "/inv");
        assert_eq!(services.turns.commands().save(), "/save");
        assert_eq!(services.turns.dice().to_string(), "3d20 (min)");
        assert_eq!(services.pricing, None);
    }
}
