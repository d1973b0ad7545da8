//! Append-only log of binary judgments.
//!
//! Persisted as `[["Galaxy", 1], ["Pixel", -1], ...]`.

use serde::{Deserialize, Serialize};

/// Signed reward of one judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Reward {
    Positive,
    Negative,
}

impl Reward {
    pub fn from_judgment(is_correct: bool) -> Self {
        if is_correct {
            Reward::Positive
        } else {
            Reward::Negative
        }
    }

    pub fn value(self) -> f64 {
        match self {
            Reward::Positive => 1.0,
            Reward::Negative => -1.0,
        }
    }
}

impl From<Reward> for i64 {
    fn from(reward: Reward) -> Self {
        match reward {
            Reward::Positive => 1,
            Reward::Negative => -1,
        }
    }
}

impl TryFrom<i64> for Reward {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Reward::Positive),
            -1 => Ok(Reward::Negative),
            other => Err(format!("reward must be 1 or -1, got {other}")),
        }
    }
}

/// One `(entity_text, reward)` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry(pub String, pub Reward);

impl FeedbackEntry {
    pub fn entity(&self) -> &str {
        &self.0
    }

    pub fn reward(&self) -> Reward {
        self.1
    }
}

/// Ordered feedback history. Never deduplicated, never truncated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackLog {
    entries: Vec<FeedbackEntry>,
}

impl FeedbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a judgment and return its reward.
    pub fn record(&mut self, entity: &str, is_correct: bool) -> Reward {
        let reward = Reward::from_judgment(is_correct);
        self.entries.push(FeedbackEntry(entity.to_string(), reward));
        reward
    }

    pub fn entries(&self) -> &[FeedbackEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of records for one entity text.
    pub fn count_for(&self, entity: &str) -> usize {
        self.entries.iter().filter(|e| e.0 == entity).count()
    }
}
