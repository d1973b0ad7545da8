//! NER (Named Entity Recognition) engine abstraction.
//!
//! The model is a black box mapping text to a list of labelled spans.
//! [`NerEngine`] is the seam; concrete engines:
//!
//! - [`GazetteerEngine`] - dictionary lookup over configured terms
//! - [`HttpNerEngine`] - a remote inference service
//! - `GlinerEngine` - a local GLiNER model (feature `gliner`)
//!
//! [`fetch_model_files`] pulls model files out of a blob store into a local
//! cache before a local engine loads them.

mod error;
mod gazetteer;
#[cfg(feature = "gliner")]
mod gliner;
mod http;
mod model;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use error::{NerError, Result};
pub use gazetteer::GazetteerEngine;
#[cfg(feature = "gliner")]
pub use gliner::{GlinerConfig, GlinerEngine};
pub use http::HttpNerEngine;
pub use model::{MODEL_FILE, TOKENIZER_FILE, fetch_model_files};

/// A recognized entity span from NER inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NerSpan {
    /// The entity text as it appears in the input.
    pub text: String,
    /// The entity class label (e.g., "BRAND", "PRODUCT").
    pub label: String,
    /// Confidence score from the model (0.0 to 1.0).
    #[serde(default = "default_score")]
    pub score: f32,
}

fn default_score() -> f32 {
    1.0
}

impl NerSpan {
    /// Create a span with full confidence.
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            score: 1.0,
        }
    }

    /// Set the confidence score.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }
}

/// Trait for NER inference engines.
///
/// Calls are blocking; async callers should use the blocking pool.
pub trait NerEngine: Send + Sync {
    /// Run NER inference on `text`, recognizing the given entity labels.
    ///
    /// Spans come back in the engine's own order.
    fn extract(&self, text: &str, labels: &[&str]) -> Result<Vec<NerSpan>>;

    /// Short engine name for logging.
    fn name(&self) -> &str;
}

/// Clean up raw engine output before review.
///
/// Drops spans below `threshold` and spans with blank text, then keeps
/// only the first occurrence of each entity text. Feedback is keyed by
/// entity text, so a repeated span would be judged twice under one key.
pub fn normalize_spans(spans: Vec<NerSpan>, threshold: f32) -> Vec<NerSpan> {
    let mut seen = HashSet::new();
    spans
        .into_iter()
        .filter(|span| span.score >= threshold && !span.text.trim().is_empty())
        .filter(|span| seen.insert(span.text.clone()))
        .collect()
}
