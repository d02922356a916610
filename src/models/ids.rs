//! Content-derived identifiers: deck hashes and normalized player tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical, order-independent identifier for a deck.
///
/// A `DeckHash` is the full lowercase hex SHA-256 digest of a deck's sorted
/// composition. It is only ever minted by [`crate::identity::IdentityBuilder`],
/// which owns the canonicalization rules; everything else treats it as an
/// opaque key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeckHash(String);

impl DeckHash {
    /// Wrap an already-computed digest string.
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    /// Get the hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeckHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for DeckHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeckHash({})", self.0)
    }
}

impl From<&str> for DeckHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A ladder player tag, normalized on construction.
///
/// Tags are case-insensitive upstream; we store them trimmed, uppercased and
/// `#`-prefixed so the same player never appears under two spellings.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerTag(String);

impl PlayerTag {
    /// Normalize a raw tag: strip whitespace, uppercase, ensure leading `#`.
    pub fn normalize(raw: &str) -> Self {
        let cleaned = raw.trim().to_uppercase();
        if cleaned.starts_with('#') {
            Self(cleaned)
        } else {
            Self(format!("#{}", cleaned))
        }
    }

    /// Get the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for PlayerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlayerTag({})", self.0)
    }
}

impl From<&str> for PlayerTag {
    fn from(s: &str) -> Self {
        Self::normalize(s)
    }
}
