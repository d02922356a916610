//! Rollup engine: the five aggregation passes.
//!
//! Each pass is a pure integer group-by-sum over already-loaded, read-only
//! input. The passes share nothing and write disjoint outputs, so the refresh
//! controller runs them as independent concurrent tasks; order of summation
//! never affects the result.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::models::{
    Deck, DeckHash, DeckTypeTotals, MatchOutcome, PlayerDeckFact, PlayerTypeCardTotals,
    RollupSet, TypeCardTotals, TypeDeckTotals, TypeMatchups, Winner,
};

/// Errors from rollup computation. Referential gaps abort the cycle rather
/// than being skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RollupError {
    #[error("fact references deck {0} missing from the deck dimension")]
    UnknownFactDeck(DeckHash),

    #[error("match outcome references deck {0} missing from the deck dimension")]
    UnknownMatchDeck(DeckHash),
}

fn deck_for<'a>(
    decks: &'a BTreeMap<DeckHash, Deck>,
    hash: &DeckHash,
    err: fn(DeckHash) -> RollupError,
) -> Result<&'a Deck, RollupError> {
    decks.get(hash).ok_or_else(|| err(hash.clone()))
}

/// `deck_type -> totals` over all base facts.
pub fn deck_type_totals(
    facts: &[PlayerDeckFact],
    decks: &BTreeMap<DeckHash, Deck>,
) -> Result<DeckTypeTotals, RollupError> {
    let mut table = DeckTypeTotals::new();
    for fact in facts {
        let deck = deck_for(decks, &fact.deck_hash, RollupError::UnknownFactDeck)?;
        table
            .entry(deck.deck_type.clone())
            .or_default()
            .add(fact.uses, fact.wins);
    }
    Ok(table)
}

/// `(deck_type, deck_hash) -> totals` over all base facts.
pub fn type_deck_totals(
    facts: &[PlayerDeckFact],
    decks: &BTreeMap<DeckHash, Deck>,
) -> Result<TypeDeckTotals, RollupError> {
    let mut table = TypeDeckTotals::new();
    for fact in facts {
        let deck = deck_for(decks, &fact.deck_hash, RollupError::UnknownFactDeck)?;
        table
            .entry((deck.deck_type.clone(), fact.deck_hash.clone()))
            .or_default()
            .add(fact.uses, fact.wins);
    }
    Ok(table)
}

/// `(deck_type, card_id, variant) -> totals`: each fact row expands into its
/// deck's 8 composition entries, each credited the row's full uses/wins.
pub fn type_card_totals(
    facts: &[PlayerDeckFact],
    decks: &BTreeMap<DeckHash, Deck>,
) -> Result<TypeCardTotals, RollupError> {
    let mut table = TypeCardTotals::new();
    for fact in facts {
        let deck = deck_for(decks, &fact.deck_hash, RollupError::UnknownFactDeck)?;
        for entry in &deck.composition {
            table
                .entry((deck.deck_type.clone(), entry.card_id, entry.variant))
                .or_default()
                .add(fact.uses, fact.wins);
        }
    }
    Ok(table)
}

/// Same expansion as [`type_card_totals`], additionally keyed by player.
pub fn player_type_card_totals(
    facts: &[PlayerDeckFact],
    decks: &BTreeMap<DeckHash, Deck>,
) -> Result<PlayerTypeCardTotals, RollupError> {
    let mut table = PlayerTypeCardTotals::new();
    for fact in facts {
        let deck = deck_for(decks, &fact.deck_hash, RollupError::UnknownFactDeck)?;
        for entry in &deck.composition {
            table
                .entry((
                    fact.player_tag.clone(),
                    deck.deck_type.clone(),
                    entry.card_id,
                    entry.variant,
                ))
                .or_default()
                .add(fact.uses, fact.wins);
        }
    }
    Ok(table)
}

/// Directional `(deck_type, opponent_deck_type) -> totals` from the external
/// match-outcome stream. Every match populates two independent rows, one
/// from each side's perspective, so A-vs-B and B-vs-A need not mirror each
/// other beyond `wins + losses = uses` within a row.
pub fn type_matchups(
    matches: &[MatchOutcome],
    decks: &BTreeMap<DeckHash, Deck>,
) -> Result<TypeMatchups, RollupError> {
    let mut table = TypeMatchups::new();
    for outcome in matches {
        let deck_a = deck_for(decks, &outcome.deck_a, RollupError::UnknownMatchDeck)?;
        let deck_b = deck_for(decks, &outcome.deck_b, RollupError::UnknownMatchDeck)?;

        table
            .entry((deck_a.deck_type.clone(), deck_b.deck_type.clone()))
            .or_default()
            .record_match(outcome.winner == Winner::SideA);
        table
            .entry((deck_b.deck_type.clone(), deck_a.deck_type.clone()))
            .or_default()
            .record_match(outcome.winner == Winner::SideB);
    }
    Ok(table)
}

/// Compute all five rollups sequentially. The refresh controller prefers
/// spawning the passes concurrently; this entry point exists for tests and
/// callers that already are on a blocking thread.
pub fn compute_all(
    facts: &[PlayerDeckFact],
    decks: &BTreeMap<DeckHash, Deck>,
    matches: &[MatchOutcome],
) -> Result<RollupSet, RollupError> {
    Ok(RollupSet {
        deck_type_totals: deck_type_totals(facts, decks)?,
        type_deck_totals: type_deck_totals(facts, decks)?,
        type_card_totals: type_card_totals(facts, decks)?,
        player_type_card_totals: player_type_card_totals(facts, decks)?,
        type_matchups: type_matchups(matches, decks)?,
    })
}
