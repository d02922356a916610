//! Player dimension: the ranked cohort under analysis.

use serde::{Deserialize, Serialize};

use super::PlayerTag;

/// A ladder player. Replaced wholesale each refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Normalized player tag
    pub player_tag: PlayerTag,

    /// Display name
    pub player_name: String,

    /// Ladder trophies at snapshot time
    pub trophies: u32,

    /// Global ladder rank at snapshot time
    pub rank_global: u32,
}
