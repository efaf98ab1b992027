//! Card database for the Lorcana rule set.
//!
//! The index is built once (from the JSON card dump) and shared by `Arc`
//! between the evaluator and deck parsing. Lookups are case-insensitive,
//! matching how deck lists spell titles.

use crate::{QuardsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Unique card identifier (e.g. `"TFC-001"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(pub String);

impl CardId {
    /// Create a card id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Broad card category. Only characters stay on the field and quest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CardType {
    /// Goes to the field, can quest from its owner's next turn.
    #[default]
    Character,
    /// Resolves and is discarded.
    Action,
    /// Stays in play; never quests.
    Item,
}

/// One entry of the card dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Unique id.
    #[serde(rename = "Unique_ID")]
    pub id: CardId,
    /// Printed title.
    #[serde(rename = "Name")]
    pub name: String,
    /// Ink cost to play.
    #[serde(rename = "Cost")]
    pub cost: u32,
    /// Whether the card may be put into the inkwell.
    #[serde(rename = "Inkable")]
    pub inkable: bool,
    /// Lore gained per quest.
    #[serde(rename = "Lore", default)]
    pub lore: u32,
    /// Card category.
    #[serde(rename = "Type", default)]
    pub card_type: CardType,
}

/// Immutable lookup table of every known card.
#[derive(Debug, Clone, Default)]
pub struct CardIndex {
    by_id: BTreeMap<String, Card>,
    by_title: BTreeMap<String, CardId>,
}

impl CardIndex {
    /// Build an index, rejecting duplicate ids.
    pub fn from_cards(cards: Vec<Card>) -> Result<Self> {
        let mut index = Self::default();
        for card in cards {
            let id_key = card.id.0.to_lowercase();
            if index.by_id.contains_key(&id_key) {
                return Err(QuardsError::ConfigError(format!(
                    "duplicate card id {}",
                    card.id.0
                )));
            }
            index
                .by_title
                .entry(card.name.to_lowercase())
                .or_insert_with(|| card.id.clone());
            index.by_id.insert(id_key, card);
        }
        Ok(index)
    }

    /// Parse a JSON array of cards.
    pub fn from_json(json: &str) -> Result<Self> {
        let cards: Vec<Card> = serde_json::from_str(json)?;
        Self::from_cards(cards)
    }

    /// Load the card dump from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            QuardsError::IoError(format!("Cannot read cards '{}': {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Look a card up by id.
    #[must_use]
    pub fn get(&self, id: &CardId) -> Option<&Card> {
        self.by_id.get(&id.0.to_lowercase())
    }

    /// Look a card up by id, failing when unknown.
    pub fn require(&self, id: &CardId) -> Result<&Card> {
        self.get(id)
            .ok_or_else(|| QuardsError::InvalidState(format!("unknown card id {}", id.0)))
    }

    /// Look a card up by title.
    #[must_use]
    pub fn by_title(&self, title: &str) -> Option<&Card> {
        self.by_title
            .get(&title.trim().to_lowercase())
            .and_then(|id| self.get(id))
    }

    /// Number of cards indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True when no cards are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
