//! Configurable LLM prompt templates used by the engine.
//!
//! Every template has a built-in default. Overrides are resolved once at
//! startup with priority: Environment Variable > Prompt File > Default.

use std::collections::HashMap;
use std::path::Path;

use crate::infrastructure::ports::PersistenceError;

/// All prompt template keys as constants.
pub mod keys {
    // === Game Loop ===
    /// System prompt for the game master narrating every turn.
    pub const GAME_MASTER_SYSTEM_PROMPT: &str = "game_master.system_prompt";
    /// User message wrapping the player's action and dice roll.
    pub const GAME_MASTER_TURN: &str = "game_master.turn";
    /// System prompt for the opening message of a new game.
    pub const STARTING_MESSAGE_SYSTEM_PROMPT: &str = "starting_message.system_prompt";

    // === Generation ===
    /// System prompt turning a setting seed into a world description.
    pub const WORLD_GENERATION: &str = "generation.world";
    /// System prompt turning a world description into a main character and story.
    pub const STORY_GENERATION: &str = "generation.story";
    /// System prompt turning a story into a starting inventory.
    pub const INVENTORY_GENERATION: &str = "generation.inventory";
}

/// Default values for all prompt templates.
pub mod defaults {
    /// Game master system prompt.
    ///
    /// Placeholders: `world_description`, `story`, `inventory`, `dice_legend`,
    /// `language_instructions`, `response_template`.
    pub const GAME_MASTER_SYSTEM_PROMPT: &str = r#"You are the game master of a text role-playing game.
You narrate the world, play every non-player character and decide the consequences of the player's actions.

# World
{world_description}

# Story
{story}

# Player inventory at the start of this turn
{inventory}

# Dice
Every player action comes with a dice roll that decides how well it goes.
{dice_legend}

# Rules
- Narrate in the second person, addressing the player directly.
- Keep each message to a few short paragraphs and end on a moment that invites the next action.
- Respect the dice roll: a low roll means the action fails or backfires, a high roll means it succeeds.
- The player can only use items that are in the inventory.
- Report every item the player gains, spends, loses or breaks as an inventory change.
{language_instructions}

{response_template}"#;

    /// Turn user message. Placeholders: `roll`, `action`.
    pub const GAME_MASTER_TURN: &str = r#"Dice roll: {roll}
Player action: {action}"#;

    /// Starting message system prompt.
    ///
    /// Placeholders: `world_description`, `story`, `inventory`, `language_instructions`.
    pub const STARTING_MESSAGE_SYSTEM_PROMPT: &str = r#"You are the game master of a text role-playing game that is about to begin.

# World
{world_description}

# Story
{story}

# Player inventory
{inventory}

Write the opening message of the game. Introduce the player's character, where they are and what is at stake.
Address the player in the second person and finish by asking what they do next.
{language_instructions}"#;

    /// World generation system prompt. The user message is the setting seed.
    pub const WORLD_GENERATION: &str = r#"You are a worldbuilder for a text role-playing game.
Write a world description in markdown based on the setting given by the user.
If the user gives no setting, invent an original one.

Cover the geography, the main factions and cultures, the level of technology or magic, and the tensions that could drive an adventure.
Keep it under 600 words."#;

    /// Story generation system prompt. The user message is the world description.
    pub const STORY_GENERATION: &str = r#"You are a storyteller for a text role-playing game.
Based on the world description given by the user, write in markdown:

- the main character controlled by the player: name, background, abilities and motivation,
- the story: the situation at the start of the game, the main goal and the obstacles on the way.

Leave the ending open, the player will decide it. Keep it under 500 words."#;

    /// Inventory generation system prompt. The user message is the story.
    ///
    /// Placeholder: `response_template`.
    pub const INVENTORY_GENERATION: &str = r#"You are preparing a text role-playing game.
Based on the story given by the user, decide what the main character carries at the start of the game.

Include only items that make sense for the character and the story. Do not include items with zero quantity.

{response_template}"#;
}

/// Convert a template key to its environment variable name.
pub fn key_to_env_var(key: &str) -> String {
    format!("AIRPG_PROMPT_{}", key.to_uppercase().replace('.', "_"))
}

/// Get the default value for a template key.
pub fn get_default(key: &str) -> Option<&'static str> {
    match key {
        keys::GAME_MASTER_SYSTEM_PROMPT => Some(defaults::GAME_MASTER_SYSTEM_PROMPT),
        keys::GAME_MASTER_TURN => Some(defaults::GAME_MASTER_TURN),
        keys::STARTING_MESSAGE_SYSTEM_PROMPT => Some(defaults::STARTING_MESSAGE_SYSTEM_PROMPT),
        keys::WORLD_GENERATION => Some(defaults::WORLD_GENERATION),
        keys::STORY_GENERATION => Some(defaults::STORY_GENERATION),
        keys::INVENTORY_GENERATION => Some(defaults::INVENTORY_GENERATION),
        _ => None,
    }
}

/// Get all known template keys.
pub fn all_keys() -> Vec<&'static str> {
    vec![
        keys::GAME_MASTER_SYSTEM_PROMPT,
        keys::GAME_MASTER_TURN,
        keys::STARTING_MESSAGE_SYSTEM_PROMPT,
        keys::WORLD_GENERATION,
        keys::STORY_GENERATION,
        keys::INVENTORY_GENERATION,
    ]
}

/// Substitute `{name}` placeholders in a single pass.
///
/// Placeholders without a matching variable (and any other braces, such as
/// JSON in the template) are kept verbatim. Substituted values are never
/// scanned again.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });

        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Resolved prompt templates.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    overrides: HashMap<&'static str, String>,
}

impl PromptTemplates {
    /// Built-in defaults only.
    pub fn defaults() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    /// Resolve overrides from the environment and `<prompts_dir>/<key>.md`.
    ///
    /// A missing prompts directory or file is not an error.
    pub fn load(prompts_dir: &Path) -> Result<Self, PersistenceError> {
        Self::load_with(prompts_dir, |name| std::env::var(name).ok())
    }

    fn load_with<F>(prompts_dir: &Path, env: F) -> Result<Self, PersistenceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut overrides = HashMap::new();

        for key in all_keys() {
            if let Some(value) = env(&key_to_env_var(key)) {
                tracing::debug!(key, "Prompt template overridden from environment");
                overrides.insert(key, value);
                continue;
            }

            let path = prompts_dir.join(format!("{}.md", key));
            match std::fs::read_to_string(&path) {
                Ok(value) => {
                    tracing::debug!(key, path = %path.display(), "Prompt template loaded from file");
                    overrides.insert(key, value);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(PersistenceError::io("read_prompt", path.display(), e)),
            }
        }

        Ok(Self { overrides })
    }

    /// Override one template in place.
    pub fn with_override(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.overrides.insert(key, value.into());
        self
    }

    /// The resolved template text for `key` (empty for unknown keys).
    pub fn get(&self, key: &str) -> &str {
        self.overrides
            .get(key)
            .map(String::as_str)
            .or_else(|| get_default(key))
            .unwrap_or_default()
    }

    /// Resolve and render a template in one step.
    pub fn render(&self, key: &str, vars: &[(&str, &str)]) -> String {
        render(self.get(key), vars)
    }
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_every_key_has_a_default() {
        for key in all_keys() {
            assert!(get_default(key).is_some(), "missing default for {}", key);
        }
    }

    #[test]
    fn test_key_to_env_var() {
        assert_eq!(
            key_to_env_var(keys::GAME_MASTER_TURN),
            "AIRPG_PROMPT_GAME_MASTER_TURN"
        );
    }

    #[test]
    fn test_render_substitutes_known_placeholders() {
        let rendered = render(defaults::GAME_MASTER_TURN, &[("roll", "14"), ("action", "I climb")]);
        assert_eq!(rendered, "Dice roll: 14\nPlayer action: I climb");
    }

    #[test]
    fn test_render_keeps_unknown_placeholders_and_json() {
        let rendered = render(r#"{"a": {b}} {missing}"#, &[("b", "1")]);
        assert_eq!(rendered, r#"{"a": 1} {missing}"#);
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let rendered = render("{story} / {inventory}", &[("story", "{inventory}"), ("inventory", "x")]);
        assert_eq!(rendered, "{inventory} / x");
    }

    #[test]
    fn test_resolution_order() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("game_master.turn.md"), "file turn").unwrap();
        std::fs::write(dir.path().join("generation.world.md"), "file world").unwrap();

        let templates = PromptTemplates::load_with(dir.path(), |name| {
            (name == "AIRPG_PROMPT_GENERATION_WORLD").then(|| "env world".to_string())
        })
        .unwrap();

        assert_eq!(templates.get(keys::WORLD_GENERATION), "env world");
        assert_eq!(templates.get(keys::GAME_MASTER_TURN), "file turn");
        assert_eq!(
            templates.get(keys::STORY_GENERATION),
            defaults::STORY_GENERATION
        );
    }

    #[test]
    fn test_missing_prompts_dir_uses_defaults() {
        let templates =
            PromptTemplates::load_with(Path::new("/nonexistent/prompts"), |_| None).unwrap();
        assert_eq!(
            templates.get(keys::GAME_MASTER_TURN),
            defaults::GAME_MASTER_TURN
        );
        assert_eq!(templates.get("unknown.key"), "");
    }
}
