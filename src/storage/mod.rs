//! Filesystem layout and JSONL input/output.
//!
//! Refresh inputs can be supplied as JSONL files under the data directory
//! (one entity per line); the export summary is appended the same way.

mod jsonl;

pub use jsonl::{InputFile, JsonlLoader, JsonlReader, JsonlWriter};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse {path:?} line {line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Directory the refresh-input JSONL files are read from.
    pub fn input_dir(&self) -> PathBuf {
        self.data_dir.join("input")
    }

    /// Directory export summaries are written to.
    pub fn export_dir(&self) -> PathBuf {
        self.data_dir.join("export")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}
