//! Gazetteer NER: whole-word, case-insensitive lookup of configured terms.
//!
//! Useful as a zero-dependency default and as a deterministic engine in
//! tests. Longer terms win over shorter overlapping ones.

use std::collections::BTreeMap;

use regex::Regex;

use crate::{NerEngine, NerError, NerSpan, Result};

/// Compiled matcher for one label.
#[derive(Debug)]
struct LabelMatcher {
    label: String,
    pattern: Regex,
}

/// Dictionary-based NER engine.
#[derive(Debug)]
pub struct GazetteerEngine {
    matchers: Vec<LabelMatcher>,
}

impl GazetteerEngine {
    /// Build an engine from `label -> terms`.
    ///
    /// Blank terms are ignored; labels left without terms are dropped.
    pub fn new(entries: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut matchers = Vec::new();

        for (label, terms) in entries {
            let mut terms: Vec<&str> = terms
                .iter()
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .collect();
            if terms.is_empty() {
                continue;
            }
            // Longest alternative first so "Galaxy S24" beats "Galaxy"
            terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            terms.dedup();

            let alternation = terms
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
                .map_err(|e| NerError::Config(format!("bad gazetteer for '{label}': {e}")))?;

            matchers.push(LabelMatcher {
                label: label.clone(),
                pattern,
            });
        }

        Ok(Self { matchers })
    }

    /// Number of labels with at least one term.
    pub fn label_count(&self) -> usize {
        self.matchers.len()
    }
}

impl NerEngine for GazetteerEngine {
    fn extract(&self, text: &str, labels: &[&str]) -> Result<Vec<NerSpan>> {
        // (start, end, label)
        let mut candidates: Vec<(usize, usize, &str)> = Vec::new();

        for matcher in &self.matchers {
            if !labels.is_empty() && !labels.contains(&matcher.label.as_str()) {
                continue;
            }
            for m in matcher.pattern.find_iter(text) {
                candidates.push((m.start(), m.end(), matcher.label.as_str()));
            }
        }

        // Leftmost first, longer first at the same start
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)));

        let mut spans = Vec::new();
        let mut cursor = 0;
        for (start, end, label) in candidates {
            if start < cursor {
                continue;
            }
            spans.push(NerSpan::new(&text[start..end], label));
            cursor = end;
        }

        Ok(spans)
    }

    fn name(&self) -> &str {
        "gazetteer"
    }
}
