//! Deck composition and the classified deck dimension row.

use serde::{Deserialize, Serialize};

use super::{CardVariant, DeckHash};

/// Number of card slots in a deck. Fixed by the game rules.
pub const DECK_SIZE: usize = 8;

/// One card slot in a deck's composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionEntry {
    /// Card id against the card catalog
    pub card_id: u32,

    /// Play-mode variant
    pub variant: CardVariant,

    /// Slot position 1..=8 as reported upstream. Informational only:
    /// never part of the deck identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<u8>,
}

impl CompositionEntry {
    pub fn new(card_id: u32, variant: CardVariant) -> Self {
        Self {
            card_id,
            variant,
            slot: None,
        }
    }

    /// The identity key for this entry; slot is deliberately excluded.
    pub fn identity_key(&self) -> (u32, CardVariant) {
        (self.card_id, self.variant)
    }
}

/// A classification label drawn from the seeded deck-type vocabulary.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeckType(String);

impl DeckType {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeckType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for DeckType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeckType({})", self.0)
    }
}

impl From<&str> for DeckType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A fully ingested deck: canonical hash, assigned type, 8-card composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    /// Canonical order-independent identifier
    pub deck_hash: DeckHash,

    /// Assigned type, from the classifier or a manual override
    pub deck_type: DeckType,

    /// Exactly [`DECK_SIZE`] entries
    pub composition: Vec<CompositionEntry>,
}

/// A manual `deck_hash -> deck_type` override, supplied per refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckTypeOverride {
    pub deck_hash: DeckHash,
    pub deck_type: DeckType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_ignores_slot() {
        let a = CompositionEntry {
            card_id: 5,
            variant: CardVariant::Normal,
            slot: Some(1),
        };
        let b = CompositionEntry {
            card_id: 5,
            variant: CardVariant::Normal,
            slot: Some(8),
        };
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_composition_entry_slot_optional_in_json() {
        let entry: CompositionEntry =
            serde_json::from_str(r#"{"card_id": 5, "variant": "evo"}"#).unwrap();
        assert_eq!(entry.slot, None);
        assert_eq!(entry.variant, CardVariant::Evo);

        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("slot"));
    }

    #[test]
    fn test_deck_serialization() {
        let deck = Deck {
            deck_hash: DeckHash::from("abc"),
            deck_type: DeckType::from("Beatdown"),
            composition: vec![CompositionEntry::new(1, CardVariant::Normal)],
        };

        let json = serde_json::to_string(&deck).unwrap();
        let parsed: Deck = serde_json::from_str(&json).unwrap();
        assert_eq!(deck, parsed);
    }
}
