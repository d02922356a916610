//! JSONL (JSON Lines) readers/writers and the file-backed refresh loader.
//!
//! Each line is one JSON object. Unlike log-style data lakes, warehouse
//! input is all-or-nothing: a malformed line is an error, never skipped.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use super::{StorageConfig, StorageError};
use crate::refresh::{LoadError, RefreshInput, SnapshotLoader};

/// Refresh-input file names under the input directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFile {
    Cards,
    Players,
    DeckTypes,
    Facts,
    Overrides,
    Matches,
}

impl InputFile {
    /// Get the filename for this input file.
    pub fn filename(&self) -> &'static str {
        match self {
            InputFile::Cards => "cards.jsonl",
            InputFile::Players => "players.jsonl",
            InputFile::DeckTypes => "deck_types.jsonl",
            InputFile::Facts => "player_deck_facts.jsonl",
            InputFile::Overrides => "deck_type_overrides.jsonl",
            InputFile::Matches => "match_outcomes.jsonl",
        }
    }
}

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append a single entity to the file.
    pub fn append(&self, entity: &T) -> Result<(), StorageError> {
        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = BufWriter::new(file);
        let json = serde_json::to_string(entity)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        debug!("Appended entity to {:?}", self.path);
        Ok(())
    }

    /// Write entities, replacing the entire file.
    pub fn write_all(&self, entities: &[T]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;

        for entity in entities {
            let json = serde_json::to_string(entity)?;
            writeln!(writer, "{}", json)?;
            count += 1;
        }

        writer.flush()?;
        info!("Wrote {} entities to {:?}", count, self.path);

        Ok(count)
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Create a reader for a refresh-input file.
    pub fn for_input(config: &StorageConfig, file: InputFile) -> Self {
        Self::new(config.input_dir().join(file.filename()))
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all entities. A missing file reads as empty; a malformed line
    /// is an error.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut entities = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let entity = serde_json::from_str(&line).map_err(|e| StorageError::Parse {
                path: self.path.clone(),
                line: index + 1,
                source: e,
            })?;
            entities.push(entity);
        }

        debug!("Read {} entities from {:?}", entities.len(), self.path);
        Ok(entities)
    }
}

/// Refresh loader reading the full input set from JSONL files.
pub struct JsonlLoader {
    config: StorageConfig,
}

impl JsonlLoader {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SnapshotLoader for JsonlLoader {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn load(&self) -> Result<RefreshInput, LoadError> {
        let input = RefreshInput {
            cards: JsonlReader::for_input(&self.config, InputFile::Cards).read_all()?,
            players: JsonlReader::for_input(&self.config, InputFile::Players).read_all()?,
            deck_types: JsonlReader::for_input(&self.config, InputFile::DeckTypes).read_all()?,
            facts: JsonlReader::for_input(&self.config, InputFile::Facts).read_all()?,
            overrides: JsonlReader::for_input(&self.config, InputFile::Overrides).read_all()?,
            matches: JsonlReader::for_input(&self.config, InputFile::Matches).read_all()?,
        };

        info!(
            cards = input.cards.len(),
            players = input.players.len(),
            deck_types = input.deck_types.len(),
            facts = input.facts.len(),
            "loaded refresh input from {:?}",
            self.config.input_dir()
        );

        Ok(input)
    }
}
