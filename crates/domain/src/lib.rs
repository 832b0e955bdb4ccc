//! AI RPG domain layer.
//!
//! Pure value objects shared by the engine: dice aggregation, the player's
//! inventory, the conversation history and session identity. Nothing here performs I/O.

pub mod error;
pub mod ids;
pub mod value_objects;

pub use error::DomainError;
pub use ids::SessionId;

pub use value_objects::{
    ChatTurn, ConversationHistory, DiceAggregation, DiceAggregator, DiceRollResult, Inventory,
    InventoryChange, InventoryEntry, MessageRole, DEFAULT_DIE_SIZE, EMPTY_INVENTORY_MESSAGE,
};
