//! Structured narrator reply.
//!
//! The narrator answers every turn with one fenced JSON block holding
//! `reasoning`, `inventory_changes` (a list of `{name, amount}`) and `message`.
//!
//! Parsing is strict. Anything that does not fit the schema is a
//! [`NarrationFailure`], never a best-effort guess.

use regex_lite::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use airpg_domain::InventoryChange;

use super::error::NarrationFailure;

/// Schema description embedded in the game master system prompt.
pub const RESPONSE_TEMPLATE: &str = r#"# Response format
Respond with exactly one fenced JSON block and nothing else:

```json
{
  "reasoning": "Your reasoning about the current situation, player action and dice roll. It's private and will not be shown to the player.",
  "inventory_changes": [
    {"name": "Name of the item to change, exactly as it appears in the inventory", "amount": 1}
  ],
  "message": "Message that will be shown to the player."
}
```

- `inventory_changes` is a list, use `[]` when nothing changes.
- `amount` is a signed integer: positive when the player gains items, negative when they lose or spend them.
- Make sure item names are valid, especially when responding in a language other than English."#;

static JSON_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json[ \t]*\r?\n(.*?)```").expect("valid regex"));

// Chat-template tokens some local models leak into their output
static SPECIAL_TOKENS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<\|[^|>]+\|>|\[/?INST\]|<</?SYS>>").expect("valid regex")
});

/// The narrator's answer to one player action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NarrationReply {
    /// Private reasoning, never shown to the player
    pub reasoning: String,
    /// Changes to apply, in order
    pub inventory_changes: Vec<InventoryChange>,
    /// Narration shown to the player
    pub message: String,
}

impl NarrationReply {
    /// Parse the first ```json block of a raw reply.
    pub fn parse(raw: &str) -> Result<Self, NarrationFailure> {
        let cleaned = SPECIAL_TOKENS_RE.replace_all(raw, "");

        let block = JSON_BLOCK_RE
            .captures(&cleaned)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .ok_or(NarrationFailure::MissingBlock)?;

        let reply: NarrationReply = serde_json::from_str(&block).map_err(|e| {
            tracing::warn!(error = %e, "Narrator reply does not match the response schema");
            NarrationFailure::malformed(e)
        })?;

        for change in &reply.inventory_changes {
            change.validate().map_err(NarrationFailure::InvalidChange)?;
        }

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reply_with_changes() {
        let raw = r#"The rope is a good find.

```json
{
  "reasoning": "Roll of 14 is a success.",
  "inventory_changes": [{"name": "Rope", "amount": 1}, {"name": "Torch", "amount": -1}],
  "message": "You find a rope."
}
```"#;

        let reply = NarrationReply::parse(raw).unwrap();

        assert_eq!(reply.reasoning, "Roll of 14 is a success.");
        assert_eq!(reply.message, "You find a rope.");
        assert_eq!(
            reply.inventory_changes,
            vec![InventoryChange::new("Rope", 1), InventoryChange::new("Torch", -1)]
        );
    }

    #[test]
    fn test_parse_accepts_uppercase_fence_and_special_tokens() {
        let raw = "<|start|>```JSON\n{\"reasoning\": \"\", \"inventory_changes\": [], \"message\": \"Nothing happens.\"}\n```<|end|>";
        let reply = NarrationReply::parse(raw).unwrap();
        assert!(reply.inventory_changes.is_empty());
        assert_eq!(reply.message, "Nothing happens.");
    }

    #[test]
    fn test_missing_block() {
        let err = NarrationReply::parse(r#"{"reasoning": "", "inventory_changes": [], "message": "hi"}"#)
            .unwrap_err();
        assert!(matches!(err, NarrationFailure::MissingBlock));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let raw = "```json\n{\"reasoning\": \"\", \"message\": \"hi\"}\n```";
        let err = NarrationReply::parse(raw).unwrap_err();
        assert!(matches!(err, NarrationFailure::MalformedReply(_)));
    }

    #[test]
    fn test_non_integer_amount_is_malformed() {
        let raw = "```json\n{\"reasoning\": \"\", \"inventory_changes\": [{\"name\": \"Gold\", \"amount\": \"a few\"}], \"message\": \"hi\"}\n```";
        let err = NarrationReply::parse(raw).unwrap_err();
        assert!(matches!(err, NarrationFailure::MalformedReply(_)));
    }

    #[test]
    fn test_blank_item_name_is_invalid_change() {
        let raw = "```json\n{\"reasoning\": \"\", \"inventory_changes\": [{\"name\": \"  \", \"amount\": 1}], \"message\": \"hi\"}\n```";
        let err = NarrationReply::parse(raw).unwrap_err();
        assert!(matches!(err, NarrationFailure::InvalidChange(_)));
    }
}
