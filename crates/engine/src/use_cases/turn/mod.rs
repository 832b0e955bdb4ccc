//! Turn processing.
//!
//! One player turn: recognize reserved commands, roll the dice, ask the
//! narrator, apply the inventory changes it reports and render the reply.
//! A turn either completes or fails as a whole; the inventory is only touched
//! after a reply has been fully parsed.

use std::sync::Arc;

use airpg_domain::{ConversationHistory, DiceAggregator, DiceRollResult, Inventory, InventoryChange};

use crate::infrastructure::ports::{
    ChatMessage, FinishReason, LlmPort, LlmRequest, LlmResponse, RandomPort, TokenUsage,
};
use crate::prompt_templates::{keys, PromptTemplates};
use crate::use_cases::SamplingSettings;

mod commands;
mod error;
mod reply;

pub use commands::{PlayerInput, ReservedCommands};
pub use error::{NarrationFailure, TurnError};
pub use reply::{NarrationReply, RESPONSE_TEMPLATE};

/// Static material the narrator works from, fixed for a whole session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameContext {
    pub world_description: String,
    pub story: String,
    pub dice_legend: String,
    pub language_instructions: String,
}

/// A completed narrative turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    /// Full text shown to the player: roll, narration, inventory changes
    pub narration: String,
    /// The narrator's message on its own
    pub message: String,
    /// Changes applied to the inventory, in order
    pub changes: Vec<InventoryChange>,
    /// The roll this turn was narrated with
    pub roll: DiceRollResult,
    /// Token usage of the narrator call, when the service reports it
    pub usage: Option<TokenUsage>,
}

/// What a line of player input turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutput {
    /// Rendered inventory listing; no roll, no narrator call
    Inventory(String),
    /// The player asked to save; the caller owns the state to persist
    SaveRequested,
    /// A narrated turn
    Narrated(TurnResult),
}

/// Runs single turns against the narrator.
pub struct TurnProcessor {
    llm: Arc<dyn LlmPort>,
    random: Arc<dyn RandomPort>,
    prompts: Arc<PromptTemplates>,
    dice: DiceAggregator,
    commands: ReservedCommands,
    sampling: SamplingSettings,
}

impl TurnProcessor {
    pub fn new(
        llm: Arc<dyn LlmPort>,
        random: Arc<dyn RandomPort>,
        prompts: Arc<PromptTemplates>,
        dice: DiceAggregator,
    ) -> Self {
        Self {
            llm,
            random,
            prompts,
            dice,
            commands: ReservedCommands::default(),
            sampling: SamplingSettings::default(),
        }
    }

    pub fn with_commands(mut self, commands: ReservedCommands) -> Self {
        self.commands = commands;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingSettings) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn dice(&self) -> &DiceAggregator {
        &self.dice
    }

    pub fn commands(&self) -> &ReservedCommands {
        &self.commands
    }

    /// Process one line of player input.
    ///
    /// `history` is read but never modified; recording the exchange is up to
    /// the caller once this returns successfully.
    pub async fn process_turn(
        &self,
        input: &str,
        context: &GameContext,
        history: &ConversationHistory,
        inventory: &mut Inventory,
    ) -> Result<TurnOutput, NarrationFailure> {
        let action = match self.commands.classify(input) {
            PlayerInput::Inventory => return Ok(TurnOutput::Inventory(inventory.format())),
            PlayerInput::Save => return Ok(TurnOutput::SaveRequested),
            PlayerInput::Action(action) => action,
        };

        let roll = self.dice.roll_with(|sides| self.random.roll_die(sides));
        tracing::debug!(roll = %roll.breakdown(), "Rolled dice for turn");

        let total = roll.total.to_string();
        let user_message = self.prompts.render(
            keys::GAME_MASTER_TURN,
            &[("roll", total.as_str()), ("action", action)],
        );

        let request = self
            .sampling
            .apply(LlmRequest::from_history(history))
            .push(ChatMessage::user(user_message))
            .with_system_prompt(self.system_prompt(context, inventory));

        let response = self.llm.generate(request).await?;
        if response.finish_reason == FinishReason::Length {
            tracing::warn!("Narrator reply hit the token limit");
        }
        let reply = NarrationReply::parse(&response.content)?;

        inventory.apply(&reply.inventory_changes);

        tracing::info!(
            roll = roll.total,
            changes = reply.inventory_changes.len(),
            "Turn narrated"
        );

        Ok(TurnOutput::Narrated(TurnResult {
            narration: render_response(roll.total, &reply.message, &reply.inventory_changes),
            message: reply.message,
            changes: reply.inventory_changes,
            roll,
            usage: response.usage,
        }))
    }

    /// Ask the narrator for the opening message of a new game.
    pub async fn opening_message(
        &self,
        context: &GameContext,
        inventory: &Inventory,
    ) -> Result<LlmResponse, NarrationFailure> {
        let listing = inventory.format();
        let system_prompt = self.prompts.render(
            keys::STARTING_MESSAGE_SYSTEM_PROMPT,
            &[
                ("world_description", context.world_description.as_str()),
                ("story", context.story.as_str()),
                ("inventory", listing.as_str()),
                ("language_instructions", context.language_instructions.as_str()),
            ],
        );

        let request = self
            .sampling
            .apply(LlmRequest::new(vec![]))
            .with_system_prompt(system_prompt);

        Ok(self.llm.generate(request).await?)
    }

    /// Game master system prompt for the current state of the inventory.
    pub fn system_prompt(&self, context: &GameContext, inventory: &Inventory) -> String {
        let listing = inventory.format();
        self.prompts.render(
            keys::GAME_MASTER_SYSTEM_PROMPT,
            &[
                ("world_description", context.world_description.as_str()),
                ("story", context.story.as_str()),
                ("inventory", listing.as_str()),
                ("dice_legend", context.dice_legend.as_str()),
                ("language_instructions", context.language_instructions.as_str()),
                ("response_template", RESPONSE_TEMPLATE),
            ],
        )
    }
}

/// Roll line, narration and (when anything changed) the change listing,
/// separated by blank lines.
pub fn render_response(roll: u8, message: &str, changes: &[InventoryChange]) -> String {
    let mut sections = vec![format!("You roll {}.", roll), message.to_string()];
    if !changes.is_empty() {
        sections.push(Inventory::format_changes(changes));
    }
    sections.join("\n\n")
}
