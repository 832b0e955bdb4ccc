//! Saved game state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use airpg_domain::{ConversationHistory, Inventory, SessionId};

/// Everything needed to continue a game later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub session_id: SessionId,
    pub timestamp: DateTime<Utc>,
    pub total_cost: f64,
    pub world_description: String,
    pub story: String,
    pub starting_inventory: Inventory,
    pub inventory: Inventory,
    pub history: ConversationHistory,
}
