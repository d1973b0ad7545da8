//! Preference table: per-entity-text accept/reject scores.
//!
//! Each entity text is its own single state with two actions. A judgment
//! moves the chosen action's score with a one-step bandit update that
//! bootstraps from the entity's current best score:
//!
//! ```text
//! best = max(score[accept], score[reject])
//! score[action] += lr * (reward + gamma * best - score[action])
//! ```
//!
//! Repeating the same positive judgment converges the accepted score to
//! `reward / (1 - gamma)`.

use std::collections::BTreeMap;
use std::fmt;

use nerloop_config::LearningConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The two actions a reviewer can take on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// The entity is correct.
    Accept,
    /// The entity is wrong.
    Reject,
}

impl Action {
    /// Both actions, in tie-break order.
    pub const ALL: [Action; 2] = [Action::Accept, Action::Reject];

    /// The action matching a binary judgment.
    pub fn from_judgment(is_correct: bool) -> Self {
        if is_correct {
            Action::Accept
        } else {
            Action::Reject
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Accept => write!(f, "accept"),
            Action::Reject => write!(f, "reject"),
        }
    }
}

/// Scores of both actions for one entity text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionScores {
    pub accept: f64,
    pub reject: f64,
}

impl ActionScores {
    /// Score of one action.
    pub fn get(&self, action: Action) -> f64 {
        match action {
            Action::Accept => self.accept,
            Action::Reject => self.reject,
        }
    }

    fn get_mut(&mut self, action: Action) -> &mut f64 {
        match action {
            Action::Accept => &mut self.accept,
            Action::Reject => &mut self.reject,
        }
    }

    /// Highest-scoring action. Ties go to `Accept`.
    pub fn best_action(&self) -> Action {
        if self.accept >= self.reject {
            Action::Accept
        } else {
            Action::Reject
        }
    }

    /// Highest score of either action.
    pub fn best_score(&self) -> f64 {
        self.accept.max(self.reject)
    }
}

/// Step size and bootstrap weight of the update rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateParams {
    pub learning_rate: f64,
    pub discount_factor: f64,
}

impl Default for UpdateParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
        }
    }
}

impl From<&LearningConfig> for UpdateParams {
    fn from(config: &LearningConfig) -> Self {
        Self {
            learning_rate: config.learning_rate,
            discount_factor: config.discount_factor,
        }
    }
}

impl UpdateParams {
    /// Fixed point of repeated updates with a constant `reward` when the
    /// updated action is also the entity's best.
    pub fn convergence_target(&self, reward: f64) -> f64 {
        reward / (1.0 - self.discount_factor)
    }
}

/// Mapping from entity text to action scores.
///
/// Serializes as `{ "entity": { "accept": f, "reject": f } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreferenceTable {
    entries: BTreeMap<String, ActionScores>,
}

impl PreferenceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `(0.0, 0.0)` for an unseen entity text.
    ///
    /// Returns `true` if the entity was inserted, `false` if it was
    /// already present (in which case nothing changes).
    pub fn initialize(&mut self, entity: &str) -> bool {
        if self.entries.contains_key(entity) {
            return false;
        }
        self.entries
            .insert(entity.to_string(), ActionScores::default());
        true
    }

    /// Scores for an entity text, if seen.
    pub fn scores(&self, entity: &str) -> Option<ActionScores> {
        self.entries.get(entity).copied()
    }

    /// Pick an action for an entity text.
    ///
    /// With probability `exploration_rate` a uniformly random action,
    /// otherwise the best-scoring one (ties go to `Accept`). Unseen
    /// entities are scored as `(0.0, 0.0)`. Never mutates the table.
    pub fn choose_action<R: Rng + ?Sized>(
        &self,
        entity: &str,
        exploration_rate: f64,
        rng: &mut R,
    ) -> Action {
        if rng.random::<f64>() < exploration_rate {
            if rng.random_bool(0.5) {
                Action::Accept
            } else {
                Action::Reject
            }
        } else {
            self.scores(entity).unwrap_or_default().best_action()
        }
    }

    /// Apply one bandit update and return the entity's new scores.
    ///
    /// Unseen entity texts are initialized first.
    pub fn update(
        &mut self,
        entity: &str,
        action: Action,
        reward: f64,
        params: UpdateParams,
    ) -> ActionScores {
        let scores = self.entries.entry(entity.to_string()).or_default();
        let best_next = scores.best_score();
        let current = scores.get_mut(action);
        *current +=
            params.learning_rate * (reward + params.discount_factor * best_next - *current);
        *scores
    }

    /// Number of entity texts in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in entity-text order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActionScores)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Exploration rate with multiplicative decay and a floor.
///
/// Lives for the whole process and is shared by every entity; it is not
/// reset per input text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplorationSchedule {
    rate: f64,
    decay: f64,
    min_rate: f64,
}

impl Default for ExplorationSchedule {
    fn default() -> Self {
        Self::new(1.0, 0.99, 0.1)
    }
}

impl From<&LearningConfig> for ExplorationSchedule {
    fn from(config: &LearningConfig) -> Self {
        Self::new(
            config.exploration_rate,
            config.exploration_decay,
            config.min_exploration_rate,
        )
    }
}

impl ExplorationSchedule {
    /// Create a schedule starting at `rate`.
    pub fn new(rate: f64, decay: f64, min_rate: f64) -> Self {
        Self {
            rate,
            decay,
            min_rate,
        }
    }

    /// Current exploration rate.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Floor of the exploration rate.
    pub fn min_rate(&self) -> f64 {
        self.min_rate
    }

    /// Apply one decay step and return the new rate.
    pub fn decay(&mut self) -> f64 {
        self.rate = (self.rate * self.decay).max(self.min_rate);
        self.rate
    }
}
