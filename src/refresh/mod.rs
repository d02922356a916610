//! Snapshot refresh controller.
//!
//! Drives one full warehouse cycle:
//! `Idle -> Loading -> Classifying -> Aggregating -> Validating -> Publishing -> Idle`,
//! with `Failed` reachable from any non-idle phase. The whole cycle builds a
//! shadow snapshot off to the side; the previously published snapshot stays
//! queryable until the single publish swap, so a failed or cancelled attempt
//! leaves no trace beyond its log and the recorded [`RefreshState`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::classify::{
    assign_deck_type, ClassifyError, DeckTypeClassifier, DeckTypeVocabulary, OverrideResolver,
};
use crate::identity::{DeckError, DuplicatePolicy, IdentityBuilder};
use crate::models::{
    Card, CardCatalog, CompositionEntry, Deck, DeckHash, DeckType, DeckTypeOverride,
    MatchOutcome, Player, PlayerDeckFact, PlayerTag, RollupSet, Totals,
};
use crate::rollup::{self, RollupError};
use crate::snapshot::{Snapshot, SnapshotMeta, SnapshotStore};
use crate::storage::StorageError;
use crate::validate::{validate_snapshot, ValidateError, ValidateOptions};

/// Pipeline phase of the current (or last) refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPhase {
    #[default]
    Idle,
    Loading,
    Classifying,
    Aggregating,
    Validating,
    Publishing,
}

impl std::fmt::Display for RefreshPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RefreshPhase::Idle => "idle",
            RefreshPhase::Loading => "loading",
            RefreshPhase::Classifying => "classifying",
            RefreshPhase::Aggregating => "aggregating",
            RefreshPhase::Validating => "validating",
            RefreshPhase::Publishing => "publishing",
        };
        write!(f, "{}", s)
    }
}

/// Overall status of the last refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// Operator-visible state of the refresh controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshState {
    pub status: RefreshStatus,
    pub phase: RefreshPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Row counts of the currently published snapshot, per table.
    pub published_row_counts: BTreeMap<String, u64>,

    /// Errors from the last attempt, empty on success.
    pub errors: Vec<String>,
}

/// Errors from the external loader collaborator.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("upstream loader failure: {0}")]
    Upstream(String),
}

/// What went wrong inside a failed stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Deck(#[from] DeckError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    Rollup(#[from] RollupError),

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error("aggregation task failed: {0}")]
    Task(String),
}

/// Refresh failures, all leaving the prior published snapshot intact.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("a refresh is already in progress")]
    ConcurrentRefreshRejected,

    #[error("refresh cancelled during {0}")]
    Cancelled(RefreshPhase),

    #[error("refresh aborted during {phase}: {source}")]
    Aborted {
        phase: RefreshPhase,
        #[source]
        source: StageError,
    },
}

/// One raw base-fact row from the loader. The composition rides along so
/// deck identities can be minted during ingestion; rows sharing a
/// `(player, deck)` key are merged by summation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactInput {
    pub player_tag: PlayerTag,
    pub composition: Vec<CompositionEntry>,
    pub uses: i64,
    pub wins: i64,
}

/// The complete input set for one refresh, supplied by the loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshInput {
    pub cards: Vec<Card>,
    pub players: Vec<Player>,
    pub deck_types: Vec<DeckType>,
    pub facts: Vec<FactInput>,
    #[serde(default)]
    pub overrides: Vec<DeckTypeOverride>,
    #[serde(default)]
    pub matches: Vec<MatchOutcome>,
}

/// External ingestion collaborator: supplies the full input set per refresh.
#[async_trait]
pub trait SnapshotLoader: Send + Sync {
    fn name(&self) -> &'static str {
        "loader"
    }

    async fn load(&self) -> Result<RefreshInput, LoadError>;
}

/// Tunables for the controller.
#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// Configured cohort size, recorded in snapshot metadata.
    pub top_n: u32,

    /// Duplicate-card policy for deck identities.
    pub duplicates: DuplicatePolicy,

    /// Validation tunables.
    pub validate: ValidateOptions,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            top_n: 300,
            duplicates: DuplicatePolicy::Reject,
            validate: ValidateOptions::default(),
        }
    }
}

/// Everything loaded and hashed, awaiting classification.
struct WorkingSet {
    players: BTreeMap<PlayerTag, Player>,
    catalog: CardCatalog,
    vocabulary: DeckTypeVocabulary,
    compositions: BTreeMap<DeckHash, Vec<CompositionEntry>>,
    overrides: OverrideResolver,
    facts: BTreeMap<(PlayerTag, DeckHash), Totals>,
    matches: Vec<MatchOutcome>,
}

/// Orchestrates refresh cycles against a [`SnapshotStore`].
pub struct RefreshController {
    loader: Arc<dyn SnapshotLoader>,
    classifier: Arc<dyn DeckTypeClassifier>,
    options: RefreshOptions,
    store: Arc<SnapshotStore>,
    state: Arc<RwLock<RefreshState>>,
    in_flight: Mutex<()>,
    cancel_token: Arc<RwLock<bool>>,
}

impl RefreshController {
    pub fn new(
        loader: Arc<dyn SnapshotLoader>,
        classifier: Arc<dyn DeckTypeClassifier>,
        options: RefreshOptions,
        store: Arc<SnapshotStore>,
    ) -> Self {
        Self {
            loader,
            classifier,
            options,
            store,
            state: Arc::new(RwLock::new(RefreshState::default())),
            in_flight: Mutex::new(()),
            cancel_token: Arc::new(RwLock::new(false)),
        }
    }

    /// The snapshot store published snapshots land in.
    pub fn store(&self) -> Arc<SnapshotStore> {
        self.store.clone()
    }

    /// Current controller state.
    pub async fn state(&self) -> RefreshState {
        self.state.read().await.clone()
    }

    /// Request cancellation of the in-flight refresh, if any.
    pub async fn cancel(&self) {
        *self.cancel_token.write().await = true;
    }

    /// Run one full refresh cycle. A second call while one is in flight is
    /// rejected, never interleaved.
    pub async fn refresh_once(&self) -> Result<Arc<Snapshot>, RefreshError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| RefreshError::ConcurrentRefreshRejected)?;

        *self.cancel_token.write().await = false;
        {
            let mut state = self.state.write().await;
            state.status = RefreshStatus::Running;
            state.phase = RefreshPhase::Loading;
            state.started_at = Some(Utc::now());
            state.completed_at = None;
            state.errors.clear();
        }

        info!(loader = self.loader.name(), "starting refresh cycle");
        let result = self.run_cycle().await;

        let mut state = self.state.write().await;
        state.completed_at = Some(Utc::now());
        match &result {
            Ok(snapshot) => {
                state.status = RefreshStatus::Completed;
                state.phase = RefreshPhase::Idle;
                state.published_row_counts = snapshot.row_counts();
                info!(
                    decks = snapshot.decks.len(),
                    facts = snapshot.facts.len(),
                    "refresh cycle completed"
                );
            }
            Err(e) => {
                state.status = RefreshStatus::Failed;
                state.errors.push(e.to_string());
                error!(error = %e, "refresh cycle failed; prior snapshot remains published");
            }
        }

        result
    }

    async fn run_cycle(&self) -> Result<Arc<Snapshot>, RefreshError> {
        // Loading
        self.enter_phase(RefreshPhase::Loading).await?;
        let input = self
            .loader
            .load()
            .await
            .map_err(|e| abort(RefreshPhase::Loading, e))?;
        let working = build_working_set(input, self.options.duplicates)
            .map_err(|e| abort(RefreshPhase::Loading, e))?;
        info!(
            players = working.players.len(),
            cards = working.catalog.len(),
            decks = working.compositions.len(),
            facts = working.facts.len(),
            matches = working.matches.len(),
            "loaded refresh input"
        );

        // Classifying
        self.enter_phase(RefreshPhase::Classifying).await?;
        let decks = classify_decks(&working, self.classifier.as_ref())
            .map_err(|e| abort(RefreshPhase::Classifying, e))?;

        // Aggregating: five independent passes over immutable-for-this-cycle
        // inputs, joined before validation.
        self.enter_phase(RefreshPhase::Aggregating).await?;
        let facts: Vec<PlayerDeckFact> = working
            .facts
            .iter()
            .map(|((player_tag, deck_hash), totals)| PlayerDeckFact {
                player_tag: player_tag.clone(),
                deck_hash: deck_hash.clone(),
                uses: totals.uses,
                wins: totals.wins,
            })
            .collect();
        let rollups = aggregate(&decks, &facts, &working.matches)
            .await
            .map_err(|e| abort(RefreshPhase::Aggregating, e))?;

        // Validating
        self.enter_phase(RefreshPhase::Validating).await?;
        let snapshot = Snapshot {
            meta: SnapshotMeta {
                refreshed_at: Utc::now(),
                top_n: self.options.top_n,
            },
            players: working.players,
            catalog: working.catalog,
            vocabulary: working.vocabulary,
            decks,
            facts,
            rollups,
        };
        validate_snapshot(&snapshot, &self.options.validate)
            .map_err(|e| abort(RefreshPhase::Validating, e))?;

        // Publishing: the one and only point at which readers change worlds.
        self.enter_phase(RefreshPhase::Publishing).await?;
        let snapshot = Arc::new(snapshot);
        self.store.publish(snapshot.clone()).await;

        Ok(snapshot)
    }

    /// Record the phase transition, honoring a pending cancellation first.
    async fn enter_phase(&self, phase: RefreshPhase) -> Result<(), RefreshError> {
        if *self.cancel_token.read().await {
            warn!(%phase, "refresh cancelled");
            return Err(RefreshError::Cancelled(phase));
        }
        self.state.write().await.phase = phase;
        Ok(())
    }
}

fn abort(phase: RefreshPhase, source: impl Into<StageError>) -> RefreshError {
    RefreshError::Aborted {
        phase,
        source: source.into(),
    }
}

/// Loading: build dimensions, mint deck identities, merge fact rows.
fn build_working_set(
    input: RefreshInput,
    duplicates: DuplicatePolicy,
) -> Result<WorkingSet, StageError> {
    let catalog = CardCatalog::from_rows(input.cards);
    let vocabulary = DeckTypeVocabulary::from_labels(input.deck_types);

    let mut players = BTreeMap::new();
    for player in input.players {
        players.insert(player.player_tag.clone(), player);
    }

    let identity = IdentityBuilder::new(&catalog, duplicates);
    let mut compositions: BTreeMap<DeckHash, Vec<CompositionEntry>> = BTreeMap::new();
    let mut facts: BTreeMap<(PlayerTag, DeckHash), Totals> = BTreeMap::new();

    for fact in input.facts {
        let deck_hash = identity.deck_hash(&fact.composition)?;
        compositions
            .entry(deck_hash.clone())
            .or_insert(fact.composition);
        facts
            .entry((fact.player_tag, deck_hash))
            .or_default()
            .add(fact.uses, fact.wins);
    }

    Ok(WorkingSet {
        players,
        catalog,
        vocabulary,
        compositions,
        overrides: OverrideResolver::from_rows(input.overrides),
        facts,
        matches: input.matches,
    })
}

/// Classifying: assign every loaded deck its type, overrides winning.
fn classify_decks(
    working: &WorkingSet,
    classifier: &dyn DeckTypeClassifier,
) -> Result<BTreeMap<DeckHash, Deck>, StageError> {
    if working.vocabulary.is_empty() && !working.compositions.is_empty() {
        return Err(ClassifyError::EmptyVocabulary.into());
    }

    let mut decks = BTreeMap::new();
    for (deck_hash, composition) in &working.compositions {
        let deck_type = assign_deck_type(
            deck_hash,
            composition,
            classifier,
            &working.overrides,
            &working.vocabulary,
        )?;
        decks.insert(
            deck_hash.clone(),
            Deck {
                deck_hash: deck_hash.clone(),
                deck_type,
                composition: composition.clone(),
            },
        );
    }

    // An override for a deck not observed this refresh has nothing to apply
    // to. Not fatal; surfaced for the operator.
    for (deck_hash, _) in working
        .overrides
        .iter()
        .filter(|(hash, _)| !decks.contains_key(*hash))
    {
        warn!(%deck_hash, "override references a deck absent from this refresh");
    }

    Ok(decks)
}

/// Aggregating: the five rollup passes as concurrent blocking tasks.
async fn aggregate(
    decks: &BTreeMap<DeckHash, Deck>,
    facts: &[PlayerDeckFact],
    matches: &[MatchOutcome],
) -> Result<RollupSet, StageError> {
    let decks = Arc::new(decks.clone());
    let facts: Arc<Vec<PlayerDeckFact>> = Arc::new(facts.to_vec());
    let matches: Arc<Vec<MatchOutcome>> = Arc::new(matches.to_vec());

    let (d, f) = (decks.clone(), facts.clone());
    let by_type = tokio::task::spawn_blocking(move || rollup::deck_type_totals(&f, &d));
    let (d, f) = (decks.clone(), facts.clone());
    let by_type_deck = tokio::task::spawn_blocking(move || rollup::type_deck_totals(&f, &d));
    let (d, f) = (decks.clone(), facts.clone());
    let by_type_card = tokio::task::spawn_blocking(move || rollup::type_card_totals(&f, &d));
    let (d, f) = (decks.clone(), facts.clone());
    let by_player_card =
        tokio::task::spawn_blocking(move || rollup::player_type_card_totals(&f, &d));
    let (d, m) = (decks.clone(), matches.clone());
    let matchups = tokio::task::spawn_blocking(move || rollup::type_matchups(&m, &d));

    let (by_type, by_type_deck, by_type_card, by_player_card, matchups) =
        tokio::try_join!(by_type, by_type_deck, by_type_card, by_player_card, matchups)
            .map_err(|e| StageError::Task(e.to_string()))?;

    Ok(RollupSet {
        deck_type_totals: by_type?,
        type_deck_totals: by_type_deck?,
        type_card_totals: by_type_card?,
        player_type_card_totals: by_player_card?,
        type_matchups: matchups?,
    })
}
