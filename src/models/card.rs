//! Card reference dimension.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A card's play-mode variant.
///
/// Declaration order doubles as the canonical sort order used when computing
/// deck hashes: `normal < evo < hero`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CardVariant {
    Normal,
    Evo,
    Hero,
}

impl CardVariant {
    /// Stable lowercase token, used as the hash-input encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            CardVariant::Normal => "normal",
            CardVariant::Evo => "evo",
            CardVariant::Hero => "hero",
        }
    }
}

impl std::fmt::Display for CardVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A card dimension row. Immutable reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Upstream numeric card id
    pub card_id: u32,

    /// Display name
    pub card_name: String,
}

/// The full card dimension for one refresh, keyed by card id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardCatalog {
    cards: BTreeMap<u32, Card>,
}

impl CardCatalog {
    /// Build a catalog from dimension rows. Later rows win on duplicate ids.
    pub fn from_rows(rows: Vec<Card>) -> Self {
        let mut cards = BTreeMap::new();
        for card in rows {
            cards.insert(card.card_id, card);
        }
        Self { cards }
    }

    /// Whether the catalog knows this card id.
    pub fn contains(&self, card_id: u32) -> bool {
        self.cards.contains_key(&card_id)
    }

    /// Look up a card by id.
    pub fn get(&self, card_id: u32) -> Option<&Card> {
        self.cards.get(&card_id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
