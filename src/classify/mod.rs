//! Deck-type classification seam.
//!
//! The warehouse never implements classification rules. It seeds a closed
//! vocabulary of deck-type labels, invokes an injected [`DeckTypeClassifier`]
//! for each ingested deck, lets a manual override win where one exists, and
//! enforces that whichever label results is a member of the vocabulary.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::warn;

use crate::models::{CompositionEntry, DeckHash, DeckType, DeckTypeOverride};

/// Errors from classification and override resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("deck type '{label}' is not in the seeded vocabulary (deck {deck_hash})")]
    UnknownDeckType { label: String, deck_hash: DeckHash },

    #[error("deck type vocabulary is empty")]
    EmptyVocabulary,
}

/// The closed set of deck-type labels for one refresh, seeded before
/// classification runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckTypeVocabulary {
    labels: BTreeSet<DeckType>,
}

impl DeckTypeVocabulary {
    pub fn from_labels(labels: impl IntoIterator<Item = DeckType>) -> Self {
        Self {
            labels: labels.into_iter().collect(),
        }
    }

    pub fn contains(&self, label: &DeckType) -> bool {
        self.labels.contains(label)
    }

    /// The vocabulary's catch-all label, if it carries one. Used by the
    /// unknown-ratio validation check; matched case-insensitively.
    pub fn unknown_label(&self) -> Option<&DeckType> {
        self.labels
            .iter()
            .find(|l| l.as_str().eq_ignore_ascii_case("unknown"))
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeckType> {
        self.labels.iter()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Pluggable classification policy: a pure, deterministic function from an
/// 8-card composition to a deck-type label.
pub trait DeckTypeClassifier: Send + Sync {
    fn classify(&self, composition: &[CompositionEntry]) -> DeckType;
}

/// Resolves manual overrides for the current refresh's input set.
#[derive(Debug, Clone, Default)]
pub struct OverrideResolver {
    overrides: BTreeMap<DeckHash, DeckType>,
}

impl OverrideResolver {
    pub fn from_rows(rows: Vec<DeckTypeOverride>) -> Self {
        let mut overrides = BTreeMap::new();
        for row in rows {
            if let Some(prev) = overrides.insert(row.deck_hash.clone(), row.deck_type) {
                warn!(
                    deck_hash = %row.deck_hash,
                    previous = %prev,
                    "duplicate override row, keeping the later one"
                );
            }
        }
        Self { overrides }
    }

    /// The overriding type for a deck, if an override row exists.
    pub fn resolve(&self, deck_hash: &DeckHash) -> Option<&DeckType> {
        self.overrides.get(deck_hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DeckHash, &DeckType)> {
        self.overrides.iter()
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Assign a type to one deck: override first, classifier otherwise, and the
/// winning label validated against the vocabulary either way.
pub fn assign_deck_type(
    deck_hash: &DeckHash,
    composition: &[CompositionEntry],
    classifier: &dyn DeckTypeClassifier,
    overrides: &OverrideResolver,
    vocabulary: &DeckTypeVocabulary,
) -> Result<DeckType, ClassifyError> {
    let label = match overrides.resolve(deck_hash) {
        Some(label) => label.clone(),
        None => classifier.classify(composition),
    };

    if !vocabulary.contains(&label) {
        return Err(ClassifyError::UnknownDeckType {
            label: label.as_str().to_string(),
            deck_hash: deck_hash.clone(),
        });
    }

    Ok(label)
}

/// Classifier test double returning a fixed label for every composition,
/// or per-card-id labels when configured with a lookup table.
pub struct FixedClassifier {
    default: DeckType,
    by_first_card: BTreeMap<u32, DeckType>,
}

impl FixedClassifier {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            default: DeckType::new(label),
            by_first_card: BTreeMap::new(),
        }
    }

    /// Label decks whose lowest card id matches `card_id` as `label`.
    pub fn with_rule(mut self, card_id: u32, label: impl Into<String>) -> Self {
        self.by_first_card.insert(card_id, DeckType::new(label));
        self
    }
}

impl DeckTypeClassifier for FixedClassifier {
    fn classify(&self, composition: &[CompositionEntry]) -> DeckType {
        let lowest = composition.iter().map(|e| e.card_id).min();
        lowest
            .and_then(|id| self.by_first_card.get(&id))
            .unwrap_or(&self.default)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardVariant;

    fn composition(ids: &[u32]) -> Vec<CompositionEntry> {
        ids.iter()
            .map(|&id| CompositionEntry::new(id, CardVariant::Normal))
            .collect()
    }

    fn vocabulary() -> DeckTypeVocabulary {
        DeckTypeVocabulary::from_labels(vec![
            DeckType::from("Beatdown"),
            DeckType::from("Control"),
            DeckType::from("Unknown"),
        ])
    }

    #[test]
    fn test_classifier_output_validated_against_vocabulary() {
        let classifier = FixedClassifier::new("Cycle");
        let result = assign_deck_type(
            &DeckHash::from("d1"),
            &composition(&[1, 2, 3, 4, 5, 6, 7, 8]),
            &classifier,
            &OverrideResolver::default(),
            &vocabulary(),
        );

        assert!(matches!(
            result,
            Err(ClassifyError::UnknownDeckType { ref label, .. }) if label == "Cycle"
        ));
    }

    #[test]
    fn test_classifier_used_when_no_override() {
        let classifier = FixedClassifier::new("Beatdown");
        let label = assign_deck_type(
            &DeckHash::from("d1"),
            &composition(&[1, 2, 3, 4, 5, 6, 7, 8]),
            &classifier,
            &OverrideResolver::default(),
            &vocabulary(),
        )
        .unwrap();

        assert_eq!(label, DeckType::from("Beatdown"));
    }

    #[test]
    fn test_override_takes_precedence() {
        let classifier = FixedClassifier::new("Beatdown");
        let overrides = OverrideResolver::from_rows(vec![DeckTypeOverride {
            deck_hash: DeckHash::from("d1"),
            deck_type: DeckType::from("Control"),
        }]);

        let label = assign_deck_type(
            &DeckHash::from("d1"),
            &composition(&[1, 2, 3, 4, 5, 6, 7, 8]),
            &classifier,
            &overrides,
            &vocabulary(),
        )
        .unwrap();

        assert_eq!(label, DeckType::from("Control"));
    }

    #[test]
    fn test_override_value_itself_validated() {
        let classifier = FixedClassifier::new("Beatdown");
        let overrides = OverrideResolver::from_rows(vec![DeckTypeOverride {
            deck_hash: DeckHash::from("d1"),
            deck_type: DeckType::from("NotAType"),
        }]);

        let result = assign_deck_type(
            &DeckHash::from("d1"),
            &composition(&[1, 2, 3, 4, 5, 6, 7, 8]),
            &classifier,
            &overrides,
            &vocabulary(),
        );

        assert!(matches!(
            result,
            Err(ClassifyError::UnknownDeckType { ref label, .. }) if label == "NotAType"
        ));
    }

    #[test]
    fn test_override_only_applies_to_matching_deck() {
        let classifier = FixedClassifier::new("Beatdown");
        let overrides = OverrideResolver::from_rows(vec![DeckTypeOverride {
            deck_hash: DeckHash::from("other"),
            deck_type: DeckType::from("Control"),
        }]);

        let label = assign_deck_type(
            &DeckHash::from("d1"),
            &composition(&[1, 2, 3, 4, 5, 6, 7, 8]),
            &classifier,
            &overrides,
            &vocabulary(),
        )
        .unwrap();

        assert_eq!(label, DeckType::from("Beatdown"));
    }

    #[test]
    fn test_fixed_classifier_rules() {
        let classifier = FixedClassifier::new("Unknown")
            .with_rule(1, "Beatdown")
            .with_rule(11, "Control");

        assert_eq!(
            classifier.classify(&composition(&[8, 1, 3, 4, 5, 6, 7, 2])),
            DeckType::from("Beatdown")
        );
        assert_eq!(
            classifier.classify(&composition(&[11, 12, 13, 14, 15, 16, 17, 18])),
            DeckType::from("Control")
        );
        assert_eq!(
            classifier.classify(&composition(&[90, 91, 92, 93, 94, 95, 96, 97])),
            DeckType::from("Unknown")
        );
    }

    #[test]
    fn test_vocabulary_unknown_label_case_insensitive() {
        let vocab = DeckTypeVocabulary::from_labels(vec![DeckType::from("UNKNOWN")]);
        assert!(vocab.unknown_label().is_some());

        let vocab = DeckTypeVocabulary::from_labels(vec![DeckType::from("Beatdown")]);
        assert!(vocab.unknown_label().is_none());
    }
}
