//! # Meta Warehouse
//!
//! A periodically refreshed analytics warehouse for competitive deck/card
//! usage and matchup statistics across a ranked ladder cohort.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (cards, players, decks, facts, rollups)
//! - **identity**: Canonical order-independent deck hashing
//! - **classify**: Deck-type vocabulary, classifier seam, manual overrides
//! - **rollup**: The five aggregate views derived from base facts
//! - **validate**: Pre-publish invariant checks
//! - **snapshot**: Published snapshot store with atomic swap
//! - **refresh**: The load → classify → aggregate → validate → publish cycle
//! - **storage**: JSONL input files and the file-backed loader
//! - **export**: Dump summary for the export collaborator
//! - **config**: Configuration loading and validation

pub mod classify;
pub mod config;
pub mod export;
pub mod identity;
pub mod models;
pub mod refresh;
pub mod rollup;
pub mod snapshot;
pub mod storage;
pub mod validate;

pub use models::*;

use tracing_subscriber::EnvFilter;

/// Initialize structured logging for embedding binaries and tests.
/// `level` follows `RUST_LOG` directive syntax (e.g. "info",
/// "meta_warehouse=debug"). Safe to call more than once.
pub fn init_logging(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level))
        .try_init();
}
