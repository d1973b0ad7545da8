//! Corrected entities keyed by the exact input text.
//!
//! Persisted as `{ "input text": { "entity": "corrected value" } }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{FeedbackError, Result};

/// Corrections recorded for one input text.
pub type Corrections = BTreeMap<String, String>;

/// Mapping from input text to its corrections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityStore {
    inputs: BTreeMap<String, Corrections>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `original -> corrected` for a recognized entity of `input`.
    /// Last write wins.
    ///
    /// `original` must be non-empty and occur in `input`, ignoring case;
    /// otherwise the store is left untouched.
    pub fn merge_correction(&mut self, input: &str, original: &str, corrected: &str) -> Result<()> {
        if original.is_empty() {
            return Err(FeedbackError::Validation(
                "entity text must not be empty".to_string(),
            ));
        }
        if !input.to_lowercase().contains(&original.to_lowercase()) {
            return Err(FeedbackError::Validation(format!(
                "entity '{original}' does not occur in the input text"
            )));
        }
        self.insert(input, original, corrected);
        Ok(())
    }

    /// Record an entity the reviewer typed in by hand. Any non-empty
    /// text is kept, whether or not it appears in `input`.
    pub fn add_manual(&mut self, input: &str, entity_text: &str, entity_type: &str) -> bool {
        if entity_text.is_empty() || entity_type.is_empty() {
            return false;
        }
        self.insert(input, entity_text, entity_type);
        true
    }

    fn insert(&mut self, input: &str, original: &str, corrected: &str) {
        let previous = self
            .inputs
            .entry(input.to_string())
            .or_default()
            .insert(original.to_string(), corrected.to_string());
        debug!(
            entity = original,
            corrected,
            replaced = previous.is_some(),
            "Merged correction"
        );
    }

    /// Exact-match lookup of a whole input text.
    pub fn lookup(&self, input: &str) -> Option<&Corrections> {
        self.inputs.get(input)
    }

    pub fn contains(&self, input: &str) -> bool {
        self.inputs.contains_key(input)
    }

    /// Number of input texts with corrections.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}
