//! Pre-publish snapshot validation.
//!
//! Every invariant is checked across every table before a snapshot may be
//! published. Checks are named, all of them run (a failing check never masks
//! the ones after it), and any failure aborts the refresh with the full list
//! of findings.

use thiserror::Error;
use tracing::{error, info};

use crate::models::{table, Totals, DECK_SIZE};
use crate::snapshot::Snapshot;

/// Outcome of one named validation check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub name: String,
    pub ok: bool,
    pub details: String,
}

impl CheckResult {
    fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ok: true,
            details: String::new(),
        }
    }

    fn fail(name: &str, details: String) -> Self {
        Self {
            name: name.to_string(),
            ok: false,
            details,
        }
    }
}

/// Tunables for the optional sanity checks.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// When set, the player dimension must have exactly this many rows.
    pub expected_top_n: Option<u32>,

    /// Ceiling on the share of uses classified under the vocabulary's
    /// `Unknown` label, when it has one. Catches classifier regressions.
    pub max_unknown_ratio: f64,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            expected_top_n: None,
            max_unknown_ratio: 0.30,
        }
    }
}

/// Validation failure: one or more checks did not pass.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{failed} validation check(s) failed: {summary}")]
pub struct ValidateError {
    pub failed: usize,
    pub summary: String,
}

fn check_deck_composition_integrity(snapshot: &Snapshot) -> CheckResult {
    let name = "deck_cards: each deck has exactly 8 cards";
    let bad: Vec<String> = snapshot
        .decks
        .values()
        .filter(|d| d.composition.len() != DECK_SIZE)
        .take(20)
        .map(|d| format!("{} -> {}", d.deck_hash, d.composition.len()))
        .collect();

    if bad.is_empty() {
        CheckResult::pass(name)
    } else {
        CheckResult::fail(name, format!("decks with != 8 cards: {}", bad.join(", ")))
    }
}

fn check_wins_uses_sanity(snapshot: &Snapshot) -> CheckResult {
    let name = "wins/uses sanity (wins<=uses and non-negative)";

    fn bad_rows<'a>(totals: impl Iterator<Item = &'a Totals>) -> usize {
        totals
            .filter(|t| t.wins > t.uses || t.wins < 0 || t.uses < 0)
            .count()
    }

    let rollups = &snapshot.rollups;
    let per_table = [
        (
            table::PLAYER_DECKS,
            snapshot
                .facts
                .iter()
                .filter(|f| f.wins > f.uses || f.wins < 0 || f.uses < 0)
                .count(),
        ),
        (
            table::META_DECK_TYPES,
            bad_rows(rollups.deck_type_totals.values()),
        ),
        (
            table::META_TYPE_DECK_IDS,
            bad_rows(rollups.type_deck_totals.values()),
        ),
        (
            table::META_TYPE_CARDS,
            bad_rows(rollups.type_card_totals.values()),
        ),
        (
            table::PLAYER_TYPE_CARDS,
            bad_rows(rollups.player_type_card_totals.values()),
        ),
        (
            table::META_TYPE_MATCHUPS,
            bad_rows(rollups.type_matchups.values()),
        ),
    ];

    let bad: Vec<String> = per_table
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(t, n)| format!("{} has {} bad rows", t, n))
        .collect();

    if bad.is_empty() {
        CheckResult::pass(name)
    } else {
        CheckResult::fail(name, bad.join("; "))
    }
}

fn check_deck_type_referential(snapshot: &Snapshot) -> CheckResult {
    let name = "deck_type referential: every label in vocabulary";
    let vocab = &snapshot.vocabulary;
    let rollups = &snapshot.rollups;

    let mut bad: Vec<String> = Vec::new();
    for deck in snapshot.decks.values() {
        if !vocab.contains(&deck.deck_type) {
            bad.push(format!("deck {} -> {}", deck.deck_hash, deck.deck_type));
        }
    }
    for deck_type in rollups.deck_type_totals.keys() {
        if !vocab.contains(deck_type) {
            bad.push(format!("{}: {}", table::META_DECK_TYPES, deck_type));
        }
    }
    for (deck_type, _) in rollups.type_deck_totals.keys() {
        if !vocab.contains(deck_type) {
            bad.push(format!("{}: {}", table::META_TYPE_DECK_IDS, deck_type));
        }
    }
    for (deck_type, _, _) in rollups.type_card_totals.keys() {
        if !vocab.contains(deck_type) {
            bad.push(format!("{}: {}", table::META_TYPE_CARDS, deck_type));
        }
    }
    for (_, deck_type, _, _) in rollups.player_type_card_totals.keys() {
        if !vocab.contains(deck_type) {
            bad.push(format!("{}: {}", table::PLAYER_TYPE_CARDS, deck_type));
        }
    }
    for (own, opp) in rollups.type_matchups.keys() {
        if !vocab.contains(own) || !vocab.contains(opp) {
            bad.push(format!("{}: ({}, {})", table::META_TYPE_MATCHUPS, own, opp));
        }
    }

    if bad.is_empty() {
        CheckResult::pass(name)
    } else {
        bad.truncate(20);
        CheckResult::fail(name, format!("labels outside vocabulary: {}", bad.join(", ")))
    }
}

fn check_deck_hash_referential(snapshot: &Snapshot) -> CheckResult {
    let name = "deck_hash referential: every reference resolves to a deck";
    let mut bad: Vec<String> = Vec::new();

    for fact in &snapshot.facts {
        if !snapshot.decks.contains_key(&fact.deck_hash) {
            bad.push(format!("{}: {}", table::PLAYER_DECKS, fact.deck_hash));
        }
    }
    for (_, deck_hash) in snapshot.rollups.type_deck_totals.keys() {
        if !snapshot.decks.contains_key(deck_hash) {
            bad.push(format!("{}: {}", table::META_TYPE_DECK_IDS, deck_hash));
        }
    }

    if bad.is_empty() {
        CheckResult::pass(name)
    } else {
        bad.truncate(20);
        CheckResult::fail(name, format!("dangling deck hashes: {}", bad.join(", ")))
    }
}

fn check_card_referential(snapshot: &Snapshot) -> CheckResult {
    let name = "card referential: every composition card in catalog";
    let mut bad: Vec<String> = Vec::new();

    for deck in snapshot.decks.values() {
        for entry in &deck.composition {
            if !snapshot.catalog.contains(entry.card_id) {
                bad.push(format!("deck {} card {}", deck.deck_hash, entry.card_id));
            }
        }
    }

    if bad.is_empty() {
        CheckResult::pass(name)
    } else {
        bad.truncate(20);
        CheckResult::fail(name, format!("unknown card ids: {}", bad.join(", ")))
    }
}

fn check_meta_not_empty(snapshot: &Snapshot) -> CheckResult {
    let name = "meta sanity: meta_deck_types not empty";
    if !snapshot.facts.is_empty() && snapshot.rollups.deck_type_totals.is_empty() {
        CheckResult::fail(
            name,
            "base facts present but meta_deck_types is empty".to_string(),
        )
    } else {
        CheckResult::pass(name)
    }
}

fn check_expected_top_n(snapshot: &Snapshot, expected: Option<u32>) -> CheckResult {
    let name = "player count matches configured Top-N";
    match expected {
        None => CheckResult::pass(name),
        Some(n) => {
            let actual = snapshot.players.len() as u32;
            if actual == n {
                CheckResult::pass(name)
            } else {
                CheckResult::fail(name, format!("player table count = {}, expected {}", actual, n))
            }
        }
    }
}

fn check_unknown_ratio(snapshot: &Snapshot, max_ratio: f64) -> CheckResult {
    let name = "deck_type sanity: unknown ratio";

    // Only meaningful when the vocabulary actually carries an Unknown label.
    let unknown = match snapshot.vocabulary.unknown_label() {
        Some(label) => label.clone(),
        None => return CheckResult::pass(name),
    };

    let total: i64 = snapshot
        .rollups
        .deck_type_totals
        .values()
        .map(|t| t.uses)
        .sum();
    if total == 0 {
        return CheckResult::pass(name);
    }

    let unknown_uses = snapshot
        .rollups
        .deck_type_totals
        .get(&unknown)
        .map(|t| t.uses)
        .unwrap_or(0);

    let ratio = unknown_uses as f64 / total as f64;
    if ratio > max_ratio {
        CheckResult::fail(
            name,
            format!(
                "Unknown uses ratio too high: {}/{} = {:.2}% (max {:.2}%)",
                unknown_uses,
                total,
                ratio * 100.0,
                max_ratio * 100.0
            ),
        )
    } else {
        CheckResult::pass(name)
    }
}

/// Run every check against a candidate snapshot.
pub fn run_checks(snapshot: &Snapshot, options: &ValidateOptions) -> Vec<CheckResult> {
    vec![
        check_deck_composition_integrity(snapshot),
        check_wins_uses_sanity(snapshot),
        check_deck_type_referential(snapshot),
        check_deck_hash_referential(snapshot),
        check_card_referential(snapshot),
        check_meta_not_empty(snapshot),
        check_expected_top_n(snapshot, options.expected_top_n),
        check_unknown_ratio(snapshot, options.max_unknown_ratio),
    ]
}

/// Validate a candidate snapshot, logging each check. Any failed check
/// yields a [`ValidateError`] carrying all findings.
pub fn validate_snapshot(
    snapshot: &Snapshot,
    options: &ValidateOptions,
) -> Result<Vec<CheckResult>, ValidateError> {
    let results = run_checks(snapshot, options);

    let mut failures: Vec<String> = Vec::new();
    for check in &results {
        if check.ok {
            info!(check = %check.name, "validation check passed");
        } else {
            error!(check = %check.name, details = %check.details, "validation check failed");
            failures.push(format!("{} ({})", check.name, check.details));
        }
    }

    if failures.is_empty() {
        Ok(results)
    } else {
        Err(ValidateError {
            failed: failures.len(),
            summary: failures.join("; "),
        })
    }
}
