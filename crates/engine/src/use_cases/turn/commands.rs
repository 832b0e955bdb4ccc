//! Reserved chat commands.

/// What the player typed, once reserved commands are recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerInput<'a> {
    /// Show the current inventory
    Inventory,
    /// Save the session
    Save,
    /// Free-text action for the narrator
    Action(&'a str),
}

/// Command tokens that bypass the narrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedCommands {
    inventory: String,
    save: String,
}

impl ReservedCommands {
    pub fn new(inventory: impl Into<String>, save: impl Into<String>) -> Self {
        Self {
            inventory: inventory.into(),
            save: save.into(),
        }
    }

    pub fn inventory(&self) -> &str {
        &self.inventory
    }

    pub fn save(&self) -> &str {
        &self.save
    }

    /// Commands match the whole input exactly, ignoring surrounding whitespace.
    pub fn classify<'a>(&self, input: &'a str) -> PlayerInput<'a> {
        let trimmed = input.trim();
        if trimmed == self.inventory {
            PlayerInput::Inventory
        } else if trimmed == self.save {
            PlayerInput::Save
        } else {
            PlayerInput::Action(input)
        }
    }
}

impl Default for ReservedCommands {
    fn default() -> Self {
        Self::new("/inventory", "/save")
    }
}
