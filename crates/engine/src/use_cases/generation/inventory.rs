//! Starting inventory generation.

use regex_lite::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use airpg_domain::{DomainError, Inventory};

use crate::infrastructure::ports::{PersistenceError, ResponseFormat};
use crate::prompt_templates::keys;

use super::{Generated, GenerationError, GenerationServices};

/// Schema description embedded in the inventory generation prompt.
pub const INVENTORY_RESPONSE_TEMPLATE: &str = r#"Respond with a single JSON object and nothing else:

{"inventory": {"Item name": 1, "Other item": 3}}

`inventory` maps item names to their quantities. Quantities are positive integers."#;

static FENCED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?[ \t]*\r?\n(.*?)```").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct InventoryDocument {
    inventory: Inventory,
}

/// Generates the character's starting inventory from the story.
pub struct InventoryGenerator {
    services: GenerationServices,
}

impl InventoryGenerator {
    pub fn new(services: GenerationServices) -> Self {
        Self { services }
    }

    /// Generate, validate and save as `inventory_<timestamp>.json`.
    ///
    /// Nothing is saved when the generated inventory is invalid.
    pub async fn generate(&self, story: &str) -> Result<Generated<Inventory>, GenerationError> {
        tracing::info!("Generating initial inventory...");
        let system_prompt = self.services.prompts().render(
            keys::INVENTORY_GENERATION,
            &[("response_template", INVENTORY_RESPONSE_TEMPLATE)],
        );
        let (response, elapsed) = self
            .services
            .request(system_prompt, story, ResponseFormat::JsonObject)
            .await?;

        let inventory = parse_inventory(&response.content)?;
        let cost = self.services.report("inventory", &response, elapsed);

        let document = serde_json::to_value(&inventory).map_err(PersistenceError::serialization)?;
        let file_name = self
            .services
            .store()
            .save_json("inventory_", &document)
            .await?;

        Ok(Generated {
            value: inventory,
            file_name,
            cost,
        })
    }
}

fn parse_inventory(raw: &str) -> Result<Inventory, GenerationError> {
    let json = extract_json(raw);
    let document: InventoryDocument = serde_json::from_str(json).map_err(|e| {
        tracing::warn!(error = %e, "Inventory generation returned invalid JSON");
        GenerationError::InvalidInventory(DomainError::parse(e.to_string()))
    })?;

    document
        .inventory
        .validate_starting()
        .map_err(GenerationError::InvalidInventory)?;

    Ok(document.inventory)
}

/// JSON mode usually returns a bare object; some servers still wrap it in a fence.
fn extract_json(raw: &str) -> &str {
    if let Some(m) = FENCED_RE.captures(raw).and_then(|caps| caps.get(1)) {
        return m.as_str().trim();
    }

    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::services;
    use super::*;
    use crate::infrastructure::ports::{LlmResponse, MockGenerationStore, MockLlmPort};

    #[tokio::test]
    async fn test_generate_inventory_keeps_order_and_saves_json() {
        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .withf(|request| request.response_format == Some(ResponseFormat::JsonObject))
            .returning(|_| {
                Ok(LlmResponse::text(
                    r#"{"inventory": {"Torch": 2, "Rope": 1, "Apple": 3}}"#,
                ))
            });

        let mut store = MockGenerationStore::new();
        store
            .expect_save_json()
            .withf(|prefix, value| {
                prefix == "inventory_"
                    && serde_json::to_string(value).unwrap_or_default()
                        == r#"{"Torch":2,"Rope":1,"Apple":3}"#
            })
            .times(1)
            .returning(|_, _| Ok("inventory_1.json".to_string()));

        let generated = InventoryGenerator::new(services(llm, store))
            .generate("You are Mira.")
            .await
            .unwrap();

        let names: Vec<&str> = generated
            .value
            .entries()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["Torch", "Rope", "Apple"]);
        assert_eq!(generated.file_name, "inventory_1.json");
    }

    #[tokio::test]
    async fn test_non_positive_quantity_is_rejected_and_not_saved() {
        let mut llm = MockLlmPort::new();
        llm.expect_generate()
            .returning(|_| Ok(LlmResponse::text(r#"{"inventory": {"Torch": 2, "Ghost": 0}}"#)));

        let mut store = MockGenerationStore::new();
        store.expect_save_json().times(0);

        let err = InventoryGenerator::new(services(llm, store))
            .generate("Story.")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::InvalidInventory(_)));
    }

    #[test]
    fn test_parse_fenced_inventory() {
        let inventory =
            parse_inventory("Here you go:\n```json\n{\"inventory\": {\"Map\": 1}}\n```").unwrap();
        assert_eq!(inventory.quantity("Map"), Some(1));
    }

    #[test]
    fn test_missing_inventory_key_is_invalid() {
        let err = parse_inventory(r#"{"items": {"Map": 1}}"#).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidInventory(_)));
    }
}
