//! Derived rollup tables, recomputed wholesale each refresh.
//!
//! All tables are `BTreeMap`-keyed so iteration order is deterministic:
//! re-running a refresh over identical input yields an identical rollup set,
//! byte for byte under any serialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CardVariant, DeckHash, DeckType, PlayerTag};

/// An exact integer uses/wins pair. The only arithmetic anywhere in the
/// rollup layer is `i64` addition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub uses: i64,
    pub wins: i64,
}

impl Totals {
    pub fn new(uses: i64, wins: i64) -> Self {
        Self { uses, wins }
    }

    /// Accumulate another uses/wins pair into this one.
    pub fn add(&mut self, uses: i64, wins: i64) {
        self.uses += uses;
        self.wins += wins;
    }

    /// Count one match from one side's perspective.
    pub fn record_match(&mut self, won: bool) {
        self.uses += 1;
        if won {
            self.wins += 1;
        }
    }
}

/// `deck_type -> totals` over all base facts.
pub type DeckTypeTotals = BTreeMap<DeckType, Totals>;

/// `(deck_type, deck_hash) -> totals`.
pub type TypeDeckTotals = BTreeMap<(DeckType, DeckHash), Totals>;

/// `(deck_type, card_id, variant) -> totals`, each of a deck's 8 cards
/// credited the full uses/wins of the fact row.
pub type TypeCardTotals = BTreeMap<(DeckType, u32, CardVariant), Totals>;

/// `(player_tag, deck_type, card_id, variant) -> totals`.
pub type PlayerTypeCardTotals = BTreeMap<(PlayerTag, DeckType, u32, CardVariant), Totals>;

/// Directional `(deck_type, opponent_deck_type) -> totals`, one row per side
/// per match. A-vs-B and B-vs-A are independent rows.
pub type TypeMatchups = BTreeMap<(DeckType, DeckType), Totals>;

/// The five derived aggregate views of one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupSet {
    pub deck_type_totals: DeckTypeTotals,
    pub type_deck_totals: TypeDeckTotals,
    pub type_card_totals: TypeCardTotals,
    pub player_type_card_totals: PlayerTypeCardTotals,
    pub type_matchups: TypeMatchups,
}

/// Warehouse table names, as used in row-count reporting and the export
/// summary. Kept aligned with the SQL schema the dump consumers expect.
pub mod table {
    pub const PLAYER: &str = "player";
    pub const CARDS: &str = "cards";
    pub const DECK_CARDS: &str = "deck_cards";
    pub const PLAYER_DECKS: &str = "player_decks";
    pub const META_DECK_TYPES: &str = "meta_deck_types";
    pub const META_TYPE_DECK_IDS: &str = "meta_type_deck_ids";
    pub const META_TYPE_CARDS: &str = "meta_type_cards";
    pub const PLAYER_TYPE_CARDS: &str = "player_type_cards";
    pub const META_TYPE_MATCHUPS: &str = "meta_type_matchups";
}

impl RollupSet {
    /// Row counts per rollup table.
    pub fn row_counts(&self) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        counts.insert(
            table::META_DECK_TYPES.to_string(),
            self.deck_type_totals.len() as u64,
        );
        counts.insert(
            table::META_TYPE_DECK_IDS.to_string(),
            self.type_deck_totals.len() as u64,
        );
        counts.insert(
            table::META_TYPE_CARDS.to_string(),
            self.type_card_totals.len() as u64,
        );
        counts.insert(
            table::PLAYER_TYPE_CARDS.to_string(),
            self.player_type_card_totals.len() as u64,
        );
        counts.insert(
            table::META_TYPE_MATCHUPS.to_string(),
            self.type_matchups.len() as u64,
        );
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_totals_add() {
        let mut totals = Totals::default();
        totals.add(10, 6);
        totals.add(5, 1);
        assert_eq!(totals, Totals::new(15, 7));
    }

    #[test]
    fn test_totals_record_match() {
        let mut totals = Totals::default();
        totals.record_match(true);
        totals.record_match(false);
        assert_eq!(totals, Totals::new(2, 1));
    }

    #[test]
    fn test_row_counts_cover_all_five_tables() {
        let mut set = RollupSet::default();
        set.deck_type_totals
            .insert(DeckType::from("Beatdown"), Totals::new(1, 1));

        let counts = set.row_counts();
        assert_eq!(counts.len(), 5);
        assert_eq!(counts[table::META_DECK_TYPES], 1);
        assert_eq!(counts[table::META_TYPE_MATCHUPS], 0);
    }
}
