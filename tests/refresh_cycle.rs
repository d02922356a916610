//! End-to-end refresh scenarios: JSONL input files through the controller
//! to a published snapshot and its export summary.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use meta_warehouse::classify::FixedClassifier;
use meta_warehouse::config::WarehouseConfig;
use meta_warehouse::export;
use meta_warehouse::identity::{DuplicatePolicy, IdentityBuilder};
use meta_warehouse::models::{
    table, Card, CardCatalog, CardVariant, CompositionEntry, DeckType, DeckTypeOverride,
    MatchOutcome, Player, PlayerTag, Totals, Winner,
};
use meta_warehouse::refresh::{
    FactInput, LoadError, RefreshController, RefreshError, RefreshInput, RefreshOptions,
    SnapshotLoader,
};
use meta_warehouse::snapshot::SnapshotStore;
use meta_warehouse::storage::{InputFile, JsonlLoader, JsonlWriter, StorageConfig};

fn composition(ids: &[u32]) -> Vec<CompositionEntry> {
    ids.iter()
        .map(|&id| CompositionEntry::new(id, CardVariant::Normal))
        .collect()
}

fn cards() -> Vec<Card> {
    (1..=20)
        .map(|i| Card {
            card_id: i,
            card_name: format!("Card {}", i),
        })
        .collect()
}

fn players() -> Vec<Player> {
    vec![
        Player {
            player_tag: PlayerTag::from("#A"),
            player_name: "Alice".to_string(),
            trophies: 9000,
            rank_global: 1,
        },
        Player {
            player_tag: PlayerTag::from("#B"),
            player_name: "Bob".to_string(),
            trophies: 8500,
            rank_global: 2,
        },
    ]
}

fn write_input_files(config: &StorageConfig) -> Result<()> {
    let dir = config.input_dir();

    JsonlWriter::new(dir.join(InputFile::Cards.filename())).write_all(&cards())?;
    JsonlWriter::new(dir.join(InputFile::Players.filename())).write_all(&players())?;
    JsonlWriter::new(dir.join(InputFile::DeckTypes.filename()))
        .write_all(&[DeckType::from("Beatdown"), DeckType::from("Control")])?;
    JsonlWriter::new(dir.join(InputFile::Facts.filename())).write_all(&[
        FactInput {
            player_tag: PlayerTag::from("#A"),
            composition: composition(&[1, 2, 3, 4, 5, 6, 7, 8]),
            uses: 10,
            wins: 6,
        },
        FactInput {
            player_tag: PlayerTag::from("#B"),
            composition: composition(&[11, 12, 13, 14, 15, 16, 17, 18]),
            uses: 5,
            wins: 1,
        },
    ])?;

    let catalog = CardCatalog::from_rows(cards());
    let identity = IdentityBuilder::new(&catalog, DuplicatePolicy::Reject);
    let d1 = identity.deck_hash(&composition(&[1, 2, 3, 4, 5, 6, 7, 8]))?;
    let d2 = identity.deck_hash(&composition(&[11, 12, 13, 14, 15, 16, 17, 18]))?;

    JsonlWriter::new(dir.join(InputFile::Matches.filename())).write_all(&[MatchOutcome {
        deck_a: d1,
        deck_b: d2,
        winner: Winner::SideA,
    }])?;

    Ok(())
}

fn classifier() -> Arc<FixedClassifier> {
    Arc::new(
        FixedClassifier::new("Beatdown")
            .with_rule(1, "Beatdown")
            .with_rule(11, "Control"),
    )
}

#[tokio::test]
async fn full_cycle_from_jsonl_files() -> Result<()> {
    let temp = TempDir::new()?;
    let storage = StorageConfig::new(temp.path().to_path_buf());
    write_input_files(&storage)?;

    let controller = RefreshController::new(
        Arc::new(JsonlLoader::new(storage.clone())),
        classifier(),
        RefreshOptions::default(),
        Arc::new(SnapshotStore::new()),
    );

    let snapshot = controller.refresh_once().await?;

    assert_eq!(
        snapshot.rollups.deck_type_totals[&DeckType::from("Beatdown")],
        Totals::new(10, 6)
    );
    assert_eq!(
        snapshot.rollups.deck_type_totals[&DeckType::from("Control")],
        Totals::new(5, 1)
    );
    assert_eq!(
        snapshot.rollups.type_matchups[&(DeckType::from("Beatdown"), DeckType::from("Control"))],
        Totals::new(1, 1)
    );
    assert_eq!(
        snapshot.rollups.type_matchups[&(DeckType::from("Control"), DeckType::from("Beatdown"))],
        Totals::new(1, 0)
    );

    // The export consumer sees the published snapshot and writes its summary.
    let store = controller.store();
    let summary = export::summarize_published(&store).await.unwrap();
    assert_eq!(summary.row_counts[table::PLAYER], 2);
    assert_eq!(summary.row_counts[table::DECK_CARDS], 16);
    assert_eq!(summary.row_counts[table::META_TYPE_MATCHUPS], 2);
    export::write_summary(&summary, &storage)?;
    assert!(storage.export_dir().join("dump_summaries.jsonl").exists());

    Ok(())
}

#[tokio::test]
async fn rerun_over_identical_input_is_byte_identical() -> Result<()> {
    let temp = TempDir::new()?;
    let storage = StorageConfig::new(temp.path().to_path_buf());
    write_input_files(&storage)?;

    let controller = RefreshController::new(
        Arc::new(JsonlLoader::new(storage)),
        classifier(),
        RefreshOptions::default(),
        Arc::new(SnapshotStore::new()),
    );

    let first = controller.refresh_once().await?;
    let second = controller.refresh_once().await?;

    assert_eq!(first.rollups, second.rollups);
    assert_eq!(first.decks, second.decks);
    assert_eq!(first.facts, second.facts);
    assert_eq!(
        format!("{:?}", first.rollups),
        format!("{:?}", second.rollups)
    );

    Ok(())
}

#[tokio::test]
async fn override_row_in_input_files_takes_precedence() -> Result<()> {
    let temp = TempDir::new()?;
    let storage = StorageConfig::new(temp.path().to_path_buf());
    write_input_files(&storage)?;

    let catalog = CardCatalog::from_rows(cards());
    let d1 = IdentityBuilder::new(&catalog, DuplicatePolicy::Reject)
        .deck_hash(&composition(&[1, 2, 3, 4, 5, 6, 7, 8]))?;

    JsonlWriter::new(storage.input_dir().join(InputFile::Overrides.filename())).write_all(&[
        DeckTypeOverride {
            deck_hash: d1.clone(),
            deck_type: DeckType::from("Control"),
        },
    ])?;

    let controller = RefreshController::new(
        Arc::new(JsonlLoader::new(storage)),
        classifier(),
        RefreshOptions::default(),
        Arc::new(SnapshotStore::new()),
    );

    let snapshot = controller.refresh_once().await?;
    assert_eq!(snapshot.decks[&d1].deck_type, DeckType::from("Control"));
    assert_eq!(
        snapshot.rollups.deck_type_totals[&DeckType::from("Control")],
        Totals::new(15, 7)
    );

    Ok(())
}

#[tokio::test]
async fn failed_refresh_leaves_published_snapshot_queryable() -> Result<()> {
    let temp = TempDir::new()?;
    let storage = StorageConfig::new(temp.path().to_path_buf());
    write_input_files(&storage)?;

    let store = Arc::new(SnapshotStore::new());
    let controller = RefreshController::new(
        Arc::new(JsonlLoader::new(storage.clone())),
        classifier(),
        RefreshOptions::default(),
        store.clone(),
    );
    let first = controller.refresh_once().await?;

    // Corrupt the facts file: wins > uses must be caught during Validating.
    JsonlWriter::new(storage.input_dir().join(InputFile::Facts.filename())).write_all(&[
        FactInput {
            player_tag: PlayerTag::from("#A"),
            composition: composition(&[1, 2, 3, 4, 5, 6, 7, 8]),
            uses: 1,
            wins: 5,
        },
    ])?;

    let err = controller.refresh_once().await.unwrap_err();
    assert!(matches!(err, RefreshError::Aborted { .. }));

    let published = store.current().await.unwrap();
    assert_eq!(published.rollups, first.rollups);
    assert_eq!(published.meta.refreshed_at, first.meta.refreshed_at);

    Ok(())
}

/// Loader that blocks long enough for a second refresh request to land.
struct SlowLoader {
    input: RefreshInput,
}

#[async_trait]
impl SnapshotLoader for SlowLoader {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn load(&self) -> Result<RefreshInput, LoadError> {
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(self.input.clone())
    }
}

#[tokio::test]
async fn second_refresh_while_one_runs_is_rejected() -> Result<()> {
    let input = RefreshInput {
        cards: cards(),
        players: players(),
        deck_types: vec![DeckType::from("Beatdown")],
        facts: vec![FactInput {
            player_tag: PlayerTag::from("#A"),
            composition: composition(&[1, 2, 3, 4, 5, 6, 7, 8]),
            uses: 3,
            wins: 2,
        }],
        overrides: vec![],
        matches: vec![],
    };

    let controller = Arc::new(RefreshController::new(
        Arc::new(SlowLoader { input }),
        Arc::new(FixedClassifier::new("Beatdown")),
        RefreshOptions::default(),
        Arc::new(SnapshotStore::new()),
    ));

    let background = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.refresh_once().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let err = controller.refresh_once().await.unwrap_err();
    assert!(matches!(err, RefreshError::ConcurrentRefreshRejected));

    // The original run still completes and publishes.
    background.await?.unwrap();
    assert!(controller.store().current().await.is_some());

    Ok(())
}

#[tokio::test]
async fn config_driven_options_enforce_top_n() -> Result<()> {
    let temp = TempDir::new()?;
    let storage = StorageConfig::new(temp.path().to_path_buf());
    write_input_files(&storage)?;

    let mut config = WarehouseConfig::default();
    config.top_n = 2;
    config.enforce_top_n = true;
    config.validate().unwrap();

    let controller = RefreshController::new(
        Arc::new(JsonlLoader::new(storage.clone())),
        classifier(),
        config.refresh_options(),
        Arc::new(SnapshotStore::new()),
    );
    // Two players in the fixture match top_n = 2.
    controller.refresh_once().await?;

    let mut strict = WarehouseConfig::default();
    strict.top_n = 300;
    strict.enforce_top_n = true;
    let failing = RefreshController::new(
        Arc::new(JsonlLoader::new(storage)),
        classifier(),
        strict.refresh_options(),
        Arc::new(SnapshotStore::new()),
    );
    assert!(failing.refresh_once().await.is_err());

    Ok(())
}
