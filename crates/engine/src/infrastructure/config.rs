//! Application configuration
//!
//! Two layers, both built once at startup and passed down explicitly:
//! - [`AppConfig`]: service endpoints, credentials and directories from the environment.
//! - [`GameConfig`]: the game setup file (generation sources, difficulty, language).

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use airpg_domain::{DiceAggregator, DomainError, DEFAULT_DIE_SIZE};

use crate::infrastructure::chat_completions::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::infrastructure::resilient_llm::RetryConfig;
use crate::use_cases::session::TokenPricing;

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Chat completions base URL (OpenAI-compatible)
    pub llm_base_url: String,
    /// Model used for every request
    pub llm_model: String,
    /// Bearer token, if the service needs one
    pub llm_api_key: Option<String>,
    /// Sampling temperature
    pub llm_temperature: Option<f32>,
    /// Cap on generated tokens per request
    pub llm_max_tokens: Option<u32>,
    /// Per-request timeout
    pub llm_timeout_secs: u64,
    /// Retry behaviour of the LLM client
    pub retry: RetryConfig,
    /// Token prices used for cost tracking; `None` disables it
    pub pricing: Option<TokenPricing>,

    /// Root of generated content and saves
    pub data_dir: PathBuf,
    /// LLM transcripts
    pub logs_dir: PathBuf,
    /// Optional prompt template overrides (`<key>.md`)
    pub prompts_dir: PathBuf,
    /// Game setup file
    pub game_config_path: PathBuf,

    /// Fixed seed for reproducible dice
    pub dice_seed: Option<u64>,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = PathBuf::from(var("AIRPG_DATA_DIR").unwrap_or_else(|| "data".to_string()));

        let pricing = match (
            var("AIRPG_PRICE_PROMPT_PER_1K"),
            var("AIRPG_PRICE_COMPLETION_PER_1K"),
        ) {
            (None, None) => None,
            (prompt, completion) => Some(TokenPricing {
                prompt_per_1k: parse_opt(prompt, "AIRPG_PRICE_PROMPT_PER_1K")?.unwrap_or(0.0),
                completion_per_1k: parse_opt(completion, "AIRPG_PRICE_COMPLETION_PER_1K")?
                    .unwrap_or(0.0),
            }),
        };

        let defaults = RetryConfig::default();

        Ok(Self {
            llm_base_url: var("AIRPG_LLM_BASE_URL")
                .or_else(|| var("OPENAI_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            llm_model: var("AIRPG_LLM_MODEL")
                .or_else(|| var("OPENAI_LLM_MODEL"))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_api_key: var("AIRPG_LLM_API_KEY").or_else(|| var("OPENAI_API_KEY")),
            llm_temperature: parse_opt(var("AIRPG_LLM_TEMPERATURE"), "AIRPG_LLM_TEMPERATURE")?
                .or(Some(0.5)),
            llm_max_tokens: parse_opt(var("AIRPG_LLM_MAX_TOKENS"), "AIRPG_LLM_MAX_TOKENS")?,
            llm_timeout_secs: parse_opt(var("AIRPG_LLM_TIMEOUT_SECS"), "AIRPG_LLM_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            retry: RetryConfig {
                max_retries: parse_opt(var("AIRPG_LLM_MAX_RETRIES"), "AIRPG_LLM_MAX_RETRIES")?
                    .unwrap_or(defaults.max_retries),
                ..defaults
            },
            pricing,
            logs_dir: PathBuf::from(var("AIRPG_LOGS_DIR").unwrap_or_else(|| "logs".to_string())),
            prompts_dir: var("AIRPG_PROMPTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("prompts")),
            game_config_path: var("AIRPG_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("config").join("ai-rpg-config.yaml")),
            dice_seed: parse_opt(var("AIRPG_DICE_SEED"), "AIRPG_DICE_SEED")?,
            data_dir,
        })
    }

    /// Directory holding generation files and saves.
    pub fn generation_dir(&self) -> PathBuf {
        self.data_dir.join("generation")
    }
}

fn parse_opt<T>(value: Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value: '{}'", key, v))
        })
        .transpose()
}

// =============================================================================
// Game setup file
// =============================================================================

/// The game setup: where content comes from, how hard the dice are, and
/// which language the narrator speaks.
#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    pub difficulty: DifficultyConfig,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub commands: CommandConfig,
}

/// Sources for the world, story and starting inventory.
///
/// `world` is either a `.md` generation file to load or a free-text seed for
/// world generation. `story` and `starting_inventory` are generation file
/// names; when unset the content is generated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub world: Option<String>,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default)]
    pub starting_inventory: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DifficultyConfig {
    pub number_of_dice: u8,
    pub dice_combine_method: String,
    #[serde(default = "default_sides")]
    pub sides: u8,
    /// Explains to the narrator what roll values mean
    #[serde(default)]
    pub dice_legend: String,
}

fn default_sides() -> u8 {
    DEFAULT_DIE_SIZE
}

/// Reserved chat commands.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandConfig {
    #[serde(default = "default_inventory_command")]
    pub inventory: String,
    #[serde(default = "default_save_command")]
    pub save: String,
}

fn default_inventory_command() -> String {
    "/inventory".to_string()
}

fn default_save_command() -> String {
    "/save".to_string()
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            inventory: default_inventory_command(),
            save: default_save_command(),
        }
    }
}

impl GameConfig {
    /// Load the setup file (format from its extension), overlaid with
    /// `AIRPG__SECTION__KEY` environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("AIRPG")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read game config {}", path.display()))?;

        settings
            .try_deserialize()
            .with_context(|| format!("Invalid game config {}", path.display()))
    }

    /// Parse a setup document held in memory.
    pub fn from_str(contents: &str, format: config::FileFormat) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(contents, format))
            .build()
            .context("Failed to parse game config")?
            .try_deserialize()
            .context("Invalid game config")
    }

    /// Validated dice pool for this game.
    pub fn dice(&self) -> Result<DiceAggregator, DomainError> {
        DiceAggregator::from_policy(
            self.difficulty.number_of_dice,
            self.difficulty.sides,
            &self.difficulty.dice_combine_method,
        )
    }

    /// Instruction line for the narrator, empty when no language is set.
    pub fn language_instructions(&self) -> String {
        match self.language.as_deref().map(str::trim) {
            Some(language) if !language.is_empty() => format!("- Respond in {}", language),
            _ => String::new(),
        }
    }
}
