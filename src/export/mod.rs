//! Export summary: the read-only dump consumer's view of a snapshot.
//!
//! The archive itself is produced by an external collaborator; this module
//! only builds the summary record (run date, timestamp, cohort size, row
//! count per table) from the currently published snapshot, and never reads
//! anything mid-publish.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::snapshot::{Snapshot, SnapshotStore};
use crate::storage::{JsonlWriter, StorageConfig, StorageError};

/// Summary record accompanying one warehouse dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpSummary {
    pub run_date: NaiveDate,
    pub run_at: DateTime<Utc>,

    /// Configured cohort size (Top-N)
    pub top_n: u32,

    /// Row count per table, dimensions and rollups included
    pub row_counts: BTreeMap<String, u64>,
}

impl DumpSummary {
    /// Build the summary for a snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let run_at = Utc::now();
        Self {
            run_date: run_at.date_naive(),
            run_at,
            top_n: snapshot.meta.top_n,
            row_counts: snapshot.row_counts(),
        }
    }
}

/// Summarize the currently published snapshot, if one exists.
pub async fn summarize_published(store: &SnapshotStore) -> Option<DumpSummary> {
    let snapshot = store.current().await?;
    Some(DumpSummary::from_snapshot(&snapshot))
}

/// Append a summary to the export log file, returning its path.
pub fn write_summary(
    summary: &DumpSummary,
    config: &StorageConfig,
) -> Result<PathBuf, StorageError> {
    let path = config.export_dir().join("dump_summaries.jsonl");
    let writer: JsonlWriter<DumpSummary> = JsonlWriter::new(path.clone());
    writer.append(summary)?;
    info!(run_date = %summary.run_date, "wrote dump summary");
    Ok(path)
}
