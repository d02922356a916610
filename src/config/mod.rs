//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::identity::DuplicatePolicy;
use crate::refresh::RefreshOptions;
use crate::validate::ValidateOptions;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main warehouse configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Cohort size: how many top ladder players the warehouse summarizes.
    #[serde(default = "default_top_n")]
    pub top_n: u32,

    /// Fail validation when the player dimension row count differs from
    /// `top_n`.
    #[serde(default)]
    pub enforce_top_n: bool,

    /// Permit the same (card, variant) pair twice within one deck.
    #[serde(default)]
    pub allow_duplicate_cards: bool,

    /// Ceiling on the Unknown deck-type usage ratio before a refresh is
    /// rejected.
    #[serde(default = "default_max_unknown_ratio")]
    pub max_unknown_ratio: f64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_top_n() -> u32 {
    300
}

fn default_max_unknown_ratio() -> f64 {
    0.30
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            top_n: default_top_n(),
            enforce_top_n: false,
            allow_duplicate_cards: false,
            max_unknown_ratio: default_max_unknown_ratio(),
        }
    }
}

impl WarehouseConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: WarehouseConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::ValidationError(
                "top_n must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.max_unknown_ratio) {
            return Err(ConfigError::ValidationError(
                "max_unknown_ratio must be between 0 and 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Derive refresh-controller options from this configuration.
    pub fn refresh_options(&self) -> RefreshOptions {
        RefreshOptions {
            top_n: self.top_n,
            duplicates: if self.allow_duplicate_cards {
                DuplicatePolicy::Allow
            } else {
                DuplicatePolicy::Reject
            },
            validate: ValidateOptions {
                expected_top_n: self.enforce_top_n.then_some(self.top_n),
                max_unknown_ratio: self.max_unknown_ratio,
            },
        }
    }
}
