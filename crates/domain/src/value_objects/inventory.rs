//! Player inventory value objects
//!
//! The inventory is a flat mapping from item name to a signed quantity. It keeps
//! first-seen insertion order so listings are stable between turns, and it never
//! prunes entries: a quantity driven to zero or below stays listed until the
//! narrator adds to it again.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::DomainError;

/// Listing shown when the inventory holds no entries at all.
pub const EMPTY_INVENTORY_MESSAGE: &str = "Inventory is empty.";

const INVENTORY_HEADER: &str = "Inventory content:";
const CHANGES_HEADER: &str = "Your inventory has changed:";

/// A named, signed change to one inventory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryChange {
    /// Item name as the narrator wrote it
    pub name: String,
    /// Change amount, e.g. +1, -5
    pub amount: i64,
}

impl InventoryChange {
    pub fn new(name: impl Into<String>, amount: i64) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }

    /// Item names must contain something other than whitespace.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation(
                "Inventory change has an empty item name",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for InventoryChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- {}: {:+}", self.name, self.amount)
    }
}

/// One line of the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub name: String,
    pub quantity: i64,
}

/// The player's items, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (name, quantity) pairs; a repeated name overwrites the earlier quantity.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let mut inventory = Self::new();
        for (name, quantity) in entries {
            inventory.set(name.into(), quantity);
        }
        inventory
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn quantity(&self, name: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.quantity)
    }

    /// Apply changes in order. An absent item starts at 0 before its delta is added.
    pub fn apply(&mut self, changes: &[InventoryChange]) {
        for change in changes {
            match self.entries.iter_mut().find(|e| e.name == change.name) {
                Some(entry) => entry.quantity = entry.quantity.saturating_add(change.amount),
                None => self.entries.push(InventoryEntry {
                    name: change.name.clone(),
                    quantity: change.amount,
                }),
            }
        }
    }

    /// Rejects empty names and non-positive quantities.
    ///
    /// Only meaningful for a freshly generated starting inventory; runtime
    /// changes may legitimately drive quantities to zero or below.
    pub fn validate_starting(&self) -> Result<(), DomainError> {
        for entry in &self.entries {
            if entry.name.trim().is_empty() {
                return Err(DomainError::validation(
                    "Inventory cannot contain items with an empty name",
                ));
            }
            if entry.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "Inventory cannot contain items with zero or negative quantity ({}: {})",
                    entry.name, entry.quantity
                )));
            }
        }
        Ok(())
    }

    /// Human-readable listing of every entry.
    pub fn format(&self) -> String {
        if self.entries.is_empty() {
            return EMPTY_INVENTORY_MESSAGE.to_string();
        }
        let mut lines = Vec::with_capacity(self.entries.len() + 1);
        lines.push(INVENTORY_HEADER.to_string());
        lines.extend(
            self.entries
                .iter()
                .map(|e| format!("- {}: {}", e.name, e.quantity)),
        );
        lines.join("\n")
    }

    /// Listing of deltas with explicit signs; empty string for no changes.
    pub fn format_changes(changes: &[InventoryChange]) -> String {
        if changes.is_empty() {
            return String::new();
        }
        let mut lines = Vec::with_capacity(changes.len() + 1);
        lines.push(CHANGES_HEADER.to_string());
        lines.extend(changes.iter().map(ToString::to_string));
        lines.join("\n")
    }

    fn set(&mut self, name: String, quantity: i64) {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.quantity = quantity,
            None => self.entries.push(InventoryEntry { name, quantity }),
        }
    }
}

// Serialized as a plain `{"name": quantity}` map, preserving entry order.
impl Serialize for Inventory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.name, &entry.quantity)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Inventory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct InventoryVisitor;

        impl<'de> Visitor<'de> for InventoryVisitor {
            type Value = Inventory;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of item names to integer quantities")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Inventory, A::Error> {
                let mut inventory = Inventory::new();
                while let Some((name, quantity)) = access.next_entry::<String, i64>()? {
                    inventory.set(name, quantity);
                }
                Ok(inventory)
            }
        }

        deserializer.deserialize_map(InventoryVisitor)
    }
}
