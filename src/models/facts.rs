//! Base facts: per-player per-deck outcome totals and pairwise match results.

use serde::{Deserialize, Serialize};

use super::{DeckHash, PlayerTag};

/// Per-player, per-deck usage and win totals.
///
/// Counts are `i64` on purpose: loader input may be malformed, and negative
/// or `wins > uses` rows must survive loading so the Validating stage can
/// report them and abort the refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDeckFact {
    pub player_tag: PlayerTag,
    pub deck_hash: DeckHash,
    pub uses: i64,
    pub wins: i64,
}

/// Which side of a match won. The ladder has no draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    SideA,
    SideB,
}

/// One pairwise match result from the external outcome stream.
///
/// This is the only input able to feed the type-vs-type matchup rollup;
/// `PlayerDeckFact` has no notion of an opponent. Not persisted in rollups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub deck_a: DeckHash,
    pub deck_b: DeckHash,
    pub winner: Winner,
}
