//! Core data structures: dimensions, facts and rollup tables.

mod card;
mod deck;
mod facts;
mod ids;
mod player;
mod rollups;

pub use card::{Card, CardCatalog, CardVariant};
pub use deck::{CompositionEntry, Deck, DeckType, DeckTypeOverride, DECK_SIZE};
pub use facts::{MatchOutcome, PlayerDeckFact, Winner};
pub use ids::{DeckHash, PlayerTag};
pub use player::Player;
pub use rollups::{
    table, DeckTypeTotals, PlayerTypeCardTotals, RollupSet, Totals, TypeCardTotals,
    TypeDeckTotals, TypeMatchups,
};
