//! Game session use case.
//!
//! Owns everything one game needs: the world and story, the inventory, the
//! conversation history and the running cost. Sessions share nothing, so
//! several can run side by side.

use std::sync::Arc;

use airpg_domain::{ConversationHistory, Inventory, SessionId};

use crate::infrastructure::ports::{ClockPort, GenerationStore, PersistenceError};
use crate::use_cases::generation::{
    GenerationError, GenerationServices, InventoryGenerator, StoryGenerator, WorldGenerator,
};
use crate::use_cases::turn::{
    GameContext, NarrationFailure, TurnError, TurnOutput, TurnProcessor, TurnResult,
};

mod cost;
mod snapshot;

pub use cost::{CostTracker, TokenPricing};
pub use snapshot::SessionSnapshot;

/// Errors while starting or resuming a session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("Failed to generate the starting message: {0}")]
    StartingMessage(#[from] NarrationFailure),
}

/// Where the session's content comes from, plus narrator settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSetup {
    /// A `.md` generation file to load, or a setting seed for generation
    pub world: Option<String>,
    /// Story generation file; generated when absent
    pub story: Option<String>,
    /// Inventory generation file; generated when absent
    pub starting_inventory: Option<String>,
    pub dice_legend: String,
    pub language_instructions: String,
}

/// Collaborators a session is built from.
pub struct SessionServices {
    pub turns: TurnProcessor,
    pub generation: GenerationServices,
    pub clock: Arc<dyn ClockPort>,
    pub pricing: Option<TokenPricing>,
}

/// Reply to one line of player input.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionReply {
    Inventory(String),
    Saved(String),
    Narrated(TurnResult),
}

impl SessionReply {
    /// Text to show the player.
    pub fn text(&self) -> &str {
        match self {
            Self::Inventory(text) | Self::Saved(text) => text,
            Self::Narrated(result) => &result.narration,
        }
    }
}

/// One game in progress.
pub struct GameSession {
    id: SessionId,
    turns: TurnProcessor,
    store: Arc<dyn GenerationStore>,
    clock: Arc<dyn ClockPort>,
    context: GameContext,
    starting_inventory: Inventory,
    inventory: Inventory,
    history: ConversationHistory,
    cost: CostTracker,
}

impl GameSession {
    /// Load or generate world, story and starting inventory.
    pub async fn bootstrap(
        services: SessionServices,
        setup: &SessionSetup,
    ) -> Result<Self, SessionError> {
        let store = services.generation.store().clone();
        let mut cost = CostTracker::new(services.pricing);

        let world_description = match setup.world.as_deref() {
            Some(name) if name.ends_with(".md") => store.read_text(name).await?,
            seed => {
                let generated = WorldGenerator::new(services.generation.clone())
                    .generate(seed.unwrap_or_default())
                    .await?;
                cost.add(generated.cost);
                generated.value
            }
        };

        let story = match setup.story.as_deref() {
            Some(name) => store.read_text(name).await?,
            None => {
                let generated = StoryGenerator::new(services.generation.clone())
                    .generate(&world_description)
                    .await?;
                cost.add(generated.cost);
                generated.value
            }
        };

        let starting_inventory = match setup.starting_inventory.as_deref() {
            Some(name) => load_inventory(store.as_ref(), name).await?,
            None => {
                let generated = InventoryGenerator::new(services.generation.clone())
                    .generate(&story)
                    .await?;
                cost.add(generated.cost);
                generated.value
            }
        };

        let id = SessionId::new();
        tracing::info!(
            session_id = %id,
            items = starting_inventory.len(),
            dice = %services.turns.dice(),
            "Session ready"
        );

        Ok(Self {
            id,
            turns: services.turns,
            store,
            clock: services.clock,
            context: GameContext {
                world_description,
                story,
                dice_legend: setup.dice_legend.clone(),
                language_instructions: setup.language_instructions.clone(),
            },
            inventory: starting_inventory.clone(),
            starting_inventory,
            history: ConversationHistory::new(),
            cost,
        })
    }

    /// Continue a game saved with [`GameSession::save`].
    ///
    /// Only the narrator settings of `setup` are used; content comes from the save.
    pub async fn resume(
        services: SessionServices,
        setup: &SessionSetup,
        file_name: &str,
    ) -> Result<Self, SessionError> {
        let store = services.generation.store().clone();
        let document = store.read_json(file_name).await?;
        let snapshot: SessionSnapshot =
            serde_json::from_value(document).map_err(PersistenceError::serialization)?;

        tracing::info!(
            session_id = %snapshot.session_id,
            file = %file_name,
            saved_at = %snapshot.timestamp,
            turns = snapshot.history.len(),
            "Resuming saved session"
        );

        Ok(Self {
            id: snapshot.session_id,
            turns: services.turns,
            store,
            clock: services.clock,
            context: GameContext {
                world_description: snapshot.world_description,
                story: snapshot.story,
                dice_legend: setup.dice_legend.clone(),
                language_instructions: setup.language_instructions.clone(),
            },
            starting_inventory: snapshot.starting_inventory,
            inventory: snapshot.inventory,
            history: snapshot.history,
            cost: CostTracker::new(services.pricing).with_total(snapshot.total_cost),
        })
    }

    /// Generate the greeting and record it as the first assistant message.
    pub async fn starting_message(&mut self) -> Result<String, SessionError> {
        tracing::info!("Generating the starting message...");
        let response = self
            .turns
            .opening_message(&self.context, &self.inventory)
            .await?;

        self.cost.record(response.usage);
        self.history.push_assistant(response.content.clone());
        Ok(response.content)
    }

    /// Handle one line of player input.
    ///
    /// Narrated turns are added to the history only once they succeed;
    /// commands are never recorded.
    pub async fn handle_input(&mut self, input: &str) -> Result<SessionReply, TurnError> {
        let output = self
            .turns
            .process_turn(input, &self.context, &self.history, &mut self.inventory)
            .await?;

        match output {
            TurnOutput::Inventory(listing) => Ok(SessionReply::Inventory(listing)),
            TurnOutput::SaveRequested => Ok(SessionReply::Saved(self.save().await?)),
            TurnOutput::Narrated(result) => {
                if let Some(cost) = self.cost.record(result.usage) {
                    tracing::debug!(cost, total = self.cost.total(), "Turn cost recorded");
                }
                self.history.push_user(input);
                self.history.push_assistant(result.narration.clone());
                Ok(SessionReply::Narrated(result))
            }
        }
    }

    /// Save the game as `game_state_<timestamp>.json`; returns the confirmation.
    pub async fn save(&self) -> Result<String, PersistenceError> {
        let document = serde_json::to_value(self.snapshot())
            .map_err(PersistenceError::serialization)?;
        let file_name = self.store.save_json("game_state_", &document).await?;
        tracing::info!(session_id = %self.id, file = %file_name, "Game state saved");

        Ok(format!(
            "Game state saved to {}!\nTotal cost: ${:.4}",
            file_name,
            self.cost.total()
        ))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            timestamp: self.clock.now(),
            total_cost: self.cost.total(),
            world_description: self.context.world_description.clone(),
            story: self.context.story.clone(),
            starting_inventory: self.starting_inventory.clone(),
            inventory: self.inventory.clone(),
            history: self.history.clone(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn context(&self) -> &GameContext {
        &self.context
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn starting_inventory(&self) -> &Inventory {
        &self.starting_inventory
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn total_cost(&self) -> f64 {
        self.cost.total()
    }
}

async fn load_inventory(
    store: &dyn GenerationStore,
    name: &str,
) -> Result<Inventory, PersistenceError> {
    let document = store.read_json(name).await?;
    serde_json::from_value(document).map_err(PersistenceError::serialization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    use airpg_domain::{DiceAggregator, MessageRole};

    use crate::infrastructure::clock::{FixedClock, FixedRandom};
    use crate::infrastructure::file_store::FileGenerationStore;
    use crate::infrastructure::ports::{LlmError, LlmPort, LlmRequest, LlmResponse, TokenUsage};
    use crate::prompt_templates::PromptTemplates;

    /// LLM answering from a script, recording what it was asked.
    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
        requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<Result<LlmResponse, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmPort for ScriptedLlm {
        async fn generate(&self, request: LlmRequest) -> Result<LlmResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::RequestFailed("script exhausted".to_string())))
        }
    }

    fn ok(content: &str) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse::text(content))
    }

    fn priced(content: &str, prompt: u32, completion: u32) -> Result<LlmResponse, LlmError> {
        let mut response = LlmResponse::text(content);
        response.usage = Some(TokenUsage {
            prompt_tokens: prompt,
            completion_tokens: completion,
            total_tokens: prompt + completion,
        });
        Ok(response)
    }

    fn reply(message: &str, changes: &str) -> String {
        format!(
            "```json\n{{\"reasoning\": \"\", \"inventory_changes\": [{}], \"message\": \"{}\"}}\n```",
            changes, message
        )
    }

    struct Fixture {
        _dir: TempDir,
        llm: Arc<ScriptedLlm>,
        store: Arc<FileGenerationStore>,
    }

    impl Fixture {
        fn new(replies: Vec<Result<LlmResponse, LlmError>>) -> Self {
            let dir = TempDir::new().unwrap();
            let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 11, 5, 14, 30, 9).unwrap()));
            let store = Arc::new(FileGenerationStore::new(dir.path().join("generation"), clock));
            Self {
                _dir: dir,
                llm: Arc::new(ScriptedLlm::new(replies)),
                store,
            }
        }

        fn services(&self, face: u8) -> SessionServices {
            let prompts = Arc::new(PromptTemplates::defaults());
            let pricing = Some(TokenPricing {
                prompt_per_1k: 1.0,
                completion_per_1k: 2.0,
            });
            let dice = DiceAggregator::from_policy(2, 20, "max").unwrap();

            SessionServices {
                turns: TurnProcessor::new(
                    self.llm.clone(),
                    Arc::new(FixedRandom(face)),
                    prompts.clone(),
                    dice,
                ),
                generation: GenerationServices::new(self.llm.clone(), self.store.clone(), prompts)
                    .with_pricing(pricing),
                clock: Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 11, 5, 15, 0, 0).unwrap())),
                pricing,
            }
        }
    }

    #[tokio::test]
    async fn test_bootstrap_generates_missing_content() {
        let fixture = Fixture::new(vec![
            priced("A drowned city.", 100, 100),
            ok("You are Mira."),
            ok(r#"{"inventory": {"Torch": 2}}"#),
        ]);

        let setup = SessionSetup {
            world: Some("underwater ruins".to_string()),
            ..SessionSetup::default()
        };
        let session = GameSession::bootstrap(fixture.services(10), &setup)
            .await
            .unwrap();

        assert_eq!(session.context().world_description, "A drowned city.");
        assert_eq!(session.context().story, "You are Mira.");
        assert_eq!(session.inventory().quantity("Torch"), Some(2));
        assert!((session.total_cost() - 0.3).abs() < 1e-9);
        assert_eq!(fixture.llm.calls(), 3);

        let world_file = fixture.store.root().join("world_2024-11-05_14-30-09.md");
        assert_eq!(std::fs::read_to_string(world_file).unwrap(), "A drowned city.");
    }

    #[tokio::test]
    async fn test_bootstrap_loads_existing_generations() {
        let fixture = Fixture::new(vec![]);
        let root = fixture.store.root().to_path_buf();
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("world_a.md"), "Loaded world").unwrap();
        std::fs::write(root.join("story_a.md"), "Loaded story").unwrap();
        std::fs::write(root.join("inventory_a.json"), r#"{"Lamp": 1, "Coin": 4}"#).unwrap();

        let setup = SessionSetup {
            world: Some("world_a.md".to_string()),
            story: Some("story_a.md".to_string()),
            starting_inventory: Some("inventory_a.json".to_string()),
            ..SessionSetup::default()
        };
        let session = GameSession::bootstrap(fixture.services(10), &setup)
            .await
            .unwrap();

        assert_eq!(session.context().story, "Loaded story");
        assert_eq!(
            session.inventory().format(),
            "Inventory content:\n- Lamp: 1\n- Coin: 4"
        );
        assert_eq!(fixture.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_generation_file_is_persistence_error() {
        let fixture = Fixture::new(vec![]);
        let setup = SessionSetup {
            world: Some("world_missing.md".to_string()),
            ..SessionSetup::default()
        };

        let err = GameSession::bootstrap(fixture.services(10), &setup)
            .await
            .err()
            .unwrap();

        assert!(matches!(err, SessionError::Persistence(ref e) if e.is_not_found()));
    }

    async fn loaded_session(fixture: &Fixture, face: u8) -> GameSession {
        let root = fixture.store.root().to_path_buf();
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("world.md"), "World").unwrap();
        std::fs::write(root.join("story.md"), "Story").unwrap();
        std::fs::write(root.join("inventory.json"), r#"{"Torch": 2}"#).unwrap();

        let setup = SessionSetup {
            world: Some("world.md".to_string()),
            story: Some("story.md".to_string()),
            starting_inventory: Some("inventory.json".to_string()),
            dice_legend: "High is good.".to_string(),
            language_instructions: String::new(),
        };
        GameSession::bootstrap(fixture.services(face), &setup)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_turns_update_history_only_on_success() {
        let fixture = Fixture::new(vec![
            priced("Welcome, diver.", 1000, 0),
            ok(&reply("You find a rope.", r#"{"name": "Rope", "amount": 1}"#)),
            ok("no block at all"),
        ]);
        let mut session = loaded_session(&fixture, 14).await;

        let greeting = session.starting_message().await.unwrap();
        assert_eq!(greeting, "Welcome, diver.");
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history().turns()[0].role, MessageRole::Assistant);

        let reply = session.handle_input("I search the wreck").await.unwrap();
        assert_eq!(
            reply.text(),
            "You roll 14.\n\nYou find a rope.\n\nYour inventory has changed:\n- Rope: +1"
        );
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.history().turns()[1].content, "I search the wreck");
        assert_eq!(session.inventory().quantity("Rope"), Some(1));

        let err = session.handle_input("I swim away").await.unwrap_err();
        assert!(matches!(err, TurnError::Narration(NarrationFailure::MissingBlock)));
        assert_eq!(session.history().len(), 3);
        assert_eq!(session.inventory().quantity("Rope"), Some(1));
        assert!((session.total_cost() - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_commands_do_not_touch_history_or_narrator() {
        let fixture = Fixture::new(vec![]);
        let mut session = loaded_session(&fixture, 14).await;

        let reply = session.handle_input("/inventory").await.unwrap();

        assert_eq!(
            reply,
            SessionReply::Inventory("Inventory content:\n- Torch: 2".to_string())
        );
        assert!(session.history().is_empty());
        assert_eq!(fixture.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_save_and_resume() {
        let fixture = Fixture::new(vec![ok(&reply(
            "The torch gutters out.",
            r#"{"name": "Torch", "amount": -1}"#,
        ))]);
        let mut session = loaded_session(&fixture, 3).await;
        session.handle_input("I light a torch").await.unwrap();

        let reply = session.handle_input("/save").await.unwrap();
        assert_eq!(
            reply.text(),
            "Game state saved to game_state_2024-11-05_14-30-09.json!\nTotal cost: $0.0000"
        );

        let resumed = GameSession::resume(
            fixture.services(3),
            &SessionSetup::default(),
            "game_state_2024-11-05_14-30-09.json",
        )
        .await
        .unwrap();

        assert_eq!(resumed.inventory().quantity("Torch"), Some(1));
        assert_eq!(resumed.starting_inventory().quantity("Torch"), Some(2));
        assert_eq!(resumed.history(), session.history());
        assert_eq!(resumed.id(), session.id());
        assert_eq!(resumed.context().world_description, "World");
    }
}
