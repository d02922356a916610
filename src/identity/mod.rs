//! Deck identity builder.
//!
//! Derives the canonical [`DeckHash`] for a deck from its 8-card composition.
//! The identity is order-independent: the entries are sorted by
//! `(card_id, variant)` before hashing, so any permutation of the same
//! multiset of pairs yields the same hash. Slot positions never participate.

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::{CardCatalog, CompositionEntry, DeckHash, DECK_SIZE};

/// Errors produced while deriving a deck identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeckError {
    #[error("deck must have exactly 8 cards, got {0}")]
    WrongSize(usize),

    #[error("unknown card id {0}")]
    UnknownCard(u32),

    #[error("duplicate card entry (card_id {card_id}, variant {variant})")]
    DuplicateEntry { card_id: u32, variant: String },
}

/// Whether a deck may contain the same `(card_id, variant)` pair twice.
///
/// The base game forbids duplicates, but the policy is the caller's to state
/// explicitly rather than an assumption baked into the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    Reject,
    Allow,
}

/// Builds canonical deck hashes, validating compositions against the card
/// catalog of the current refresh.
pub struct IdentityBuilder<'a> {
    catalog: &'a CardCatalog,
    duplicates: DuplicatePolicy,
}

impl<'a> IdentityBuilder<'a> {
    pub fn new(catalog: &'a CardCatalog, duplicates: DuplicatePolicy) -> Self {
        Self {
            catalog,
            duplicates,
        }
    }

    /// Compute the canonical hash for a composition.
    ///
    /// Fails if the composition is not exactly 8 entries, references a card
    /// id missing from the catalog, or repeats a `(card_id, variant)` pair
    /// under [`DuplicatePolicy::Reject`].
    pub fn deck_hash(&self, composition: &[CompositionEntry]) -> Result<DeckHash, DeckError> {
        if composition.len() != DECK_SIZE {
            return Err(DeckError::WrongSize(composition.len()));
        }

        let mut keys: Vec<_> = composition.iter().map(|e| e.identity_key()).collect();
        keys.sort();

        for entry in composition {
            if !self.catalog.contains(entry.card_id) {
                return Err(DeckError::UnknownCard(entry.card_id));
            }
        }

        if self.duplicates == DuplicatePolicy::Reject {
            for pair in keys.windows(2) {
                if pair[0] == pair[1] {
                    return Err(DeckError::DuplicateEntry {
                        card_id: pair[0].0,
                        variant: pair[0].1.as_str().to_string(),
                    });
                }
            }
        }

        // "{card_id}:{variant}" joined with '|'. Neither field can contain
        // ':' or '|', so the encoding is collision-free.
        let mut hasher = Sha256::new();
        for (i, (card_id, variant)) in keys.iter().enumerate() {
            if i > 0 {
                hasher.update(b"|");
            }
            hasher.update(card_id.to_string().as_bytes());
            hasher.update(b":");
            hasher.update(variant.as_str().as_bytes());
        }

        Ok(DeckHash::new(hex::encode(hasher.finalize())))
    }
}
