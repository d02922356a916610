//! Published snapshot and its store.
//!
//! A [`Snapshot`] is one fully built, validated warehouse state. The
//! [`SnapshotStore`] holds at most one published snapshot behind a lock;
//! publishing is a single `Arc` swap, so readers (queries, the export
//! consumer) always observe either the fully prior or the fully new state,
//! never a mixture. This replaces the truncate-then-reload-in-place pattern,
//! which exposes a half-emptied warehouse to concurrent readers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use crate::classify::DeckTypeVocabulary;
use crate::models::{table, CardCatalog, Deck, DeckHash, Player, PlayerDeckFact, PlayerTag, RollupSet};

/// Point-in-time metadata for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMeta {
    /// When this snapshot was published
    pub refreshed_at: DateTime<Utc>,

    /// Configured cohort size (Top-N). Informational only; never used in
    /// aggregation.
    pub top_n: u32,
}

/// One complete warehouse state: dimensions, base facts, rollups.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub meta: SnapshotMeta,
    pub players: BTreeMap<PlayerTag, Player>,
    pub catalog: CardCatalog,
    pub vocabulary: DeckTypeVocabulary,
    pub decks: BTreeMap<DeckHash, Deck>,
    pub facts: Vec<PlayerDeckFact>,
    pub rollups: RollupSet,
}

impl Snapshot {
    /// Row counts for every table in the snapshot, dimensions and facts
    /// included. Feeds refresh-state reporting and the export summary.
    pub fn row_counts(&self) -> BTreeMap<String, u64> {
        let mut counts = self.rollups.row_counts();
        counts.insert(table::PLAYER.to_string(), self.players.len() as u64);
        counts.insert(table::CARDS.to_string(), self.catalog.len() as u64);
        counts.insert(
            table::DECK_CARDS.to_string(),
            self.decks
                .values()
                .map(|d| d.composition.len() as u64)
                .sum(),
        );
        counts.insert(table::PLAYER_DECKS.to_string(), self.facts.len() as u64);
        counts
    }
}

/// Holds the currently published snapshot, if any.
#[derive(Default)]
pub struct SnapshotStore {
    published: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently published snapshot.
    pub async fn current(&self) -> Option<Arc<Snapshot>> {
        self.published.read().await.clone()
    }

    /// Atomically replace the published snapshot. The prior snapshot is
    /// returned so the caller can log it; it is dropped (discarded) once the
    /// last reader holding its `Arc` finishes.
    pub async fn publish(&self, snapshot: Arc<Snapshot>) -> Option<Arc<Snapshot>> {
        let mut guard = self.published.write().await;
        let prior = guard.replace(snapshot);
        info!(
            replaced = prior.is_some(),
            "published new warehouse snapshot"
        );
        prior
    }
}
