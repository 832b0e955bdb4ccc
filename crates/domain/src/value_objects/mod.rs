//! Value objects - Immutable objects defined by their attributes

mod conversation;
mod dice;
mod inventory;

pub use conversation::{ChatTurn, ConversationHistory, MessageRole};
pub use dice::{DiceAggregation, DiceAggregator, DiceRollResult, DEFAULT_DIE_SIZE};
pub use inventory::{Inventory, InventoryChange, InventoryEntry, EMPTY_INVENTORY_MESSAGE};
