//! Session controller: one review cycle as an explicit state machine.
//!
//! ```text
//!            submit_text            judge (last entity)
//!   Idle ─────────────────► ReviewEntities ───────────────► AwaitManualAdd
//!    ▲   │                      (n ≥ 1 entities)                  │
//!    │   │ stored input                  ▲ 0 entities             │ finish
//!    │   ▼                               └────────────────────────┤
//!    │ ShowStored                                                 ▼
//!    └───────────── reset (any state) ◄──────────────────────── Terminal
//! ```
//!
//! `ShowStored` and `Terminal` accept a new `submit_text` directly.
//! Inference, merging corrections and persisting happen inside the
//! transition that triggers them. An event that is not allowed in the
//! current state fails with [`FeedbackError::InvalidTransition`] and
//! changes nothing; so do validation and inference failures.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nerloop_config::NerSection;
use nerloop_ner::{NerEngine, NerSpan, normalize_spans};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::FeedbackContext;
use crate::documents::PersistReport;
use crate::entity_store::Corrections;
use crate::feedback_log::Reward;
use crate::preference::{Action, ActionScores, PreferenceTable};
use crate::{FeedbackError, Result};

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    ShowStored,
    ReviewEntities,
    AwaitManualAdd,
    Terminal,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CyclePhase::Idle => "idle",
            CyclePhase::ShowStored => "showing stored corrections",
            CyclePhase::ReviewEntities => "reviewing entities",
            CyclePhase::AwaitManualAdd => "awaiting a manual entity",
            CyclePhase::Terminal => "finished",
        };
        write!(f, "{s}")
    }
}

/// NER settings the controller applies to every inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceSettings {
    pub labels: Vec<String>,
    pub threshold: f32,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self::from(&NerSection::default())
    }
}

impl From<&NerSection> for InferenceSettings {
    fn from(section: &NerSection) -> Self {
        Self {
            labels: section.labels.clone(),
            threshold: section.threshold,
        }
    }
}

/// An entity the model missed, entered by the reviewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEntity {
    #[serde(default)]
    pub entity_text: String,
    #[serde(default)]
    pub entity_type: String,
}

impl ManualEntity {
    pub fn new(entity_text: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            entity_text: entity_text.into(),
            entity_type: entity_type.into(),
        }
    }

    /// Trimmed `(text, type)` when both are non-blank.
    fn filled(&self) -> Option<(&str, &str)> {
        let text = self.entity_text.trim();
        let kind = self.entity_type.trim();
        (!text.is_empty() && !kind.is_empty()).then_some((text, kind))
    }
}

/// The entity currently up for judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPrompt {
    /// Zero-based position in the cycle's entity list.
    pub index: usize,
    pub total: usize,
    pub entity: NerSpan,
    pub scores: ActionScores,
    /// The preference table's pick for this entity. Informational only.
    pub suggested_action: Action,
}

/// Result of one judgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentRecord {
    pub entity: String,
    pub action: Action,
    pub reward: Reward,
    pub scores: ActionScores,
    pub exploration_rate: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
    /// Phase after the judgment.
    pub phase: CyclePhase,
}

/// Result of a finished cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual: Option<ManualEntity>,
    /// Corrections stored for the input after this cycle.
    pub corrections: Corrections,
    pub persist: PersistReport,
    pub preferences: PreferenceTable,
    pub exploration_rate: f64,
}

/// Result of abandoning a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetReport {
    /// Phase the cycle was in before the reset.
    pub previous: CyclePhase,
    /// Present when the abandoned cycle had judgments to save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist: Option<PersistReport>,
}

/// Snapshot of the controller for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleView {
    pub phase: CyclePhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Entities recognized for the input, in model order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<NerSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<ReviewPrompt>,
    /// Stored corrections (`show_stored`), corrections waiting to be
    /// merged (`review_entities`) or merged this cycle (`await_manual_add`).
    #[serde(default, skip_serializing_if = "Corrections::is_empty")]
    pub corrections: Corrections,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<CycleSummary>,
    pub exploration_rate: f64,
}

#[derive(Debug, Clone)]
struct Cycle {
    id: Uuid,
    input: String,
    started_at: DateTime<Utc>,
}

impl Cycle {
    fn new(input: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            input: input.to_string(),
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug)]
enum State {
    Idle,
    ShowStored {
        cycle: Cycle,
    },
    ReviewEntities {
        cycle: Cycle,
        entities: Vec<NerSpan>,
        position: usize,
        suggestion: Action,
        pending: Corrections,
    },
    AwaitManualAdd {
        cycle: Cycle,
        entities: Vec<NerSpan>,
        merged: Corrections,
    },
    Terminal {
        cycle: Cycle,
        summary: CycleSummary,
    },
}

impl State {
    fn phase(&self) -> CyclePhase {
        match self {
            State::Idle => CyclePhase::Idle,
            State::ShowStored { .. } => CyclePhase::ShowStored,
            State::ReviewEntities { .. } => CyclePhase::ReviewEntities,
            State::AwaitManualAdd { .. } => CyclePhase::AwaitManualAdd,
            State::Terminal { .. } => CyclePhase::Terminal,
        }
    }

    fn cycle(&self) -> Option<&Cycle> {
        match self {
            State::Idle => None,
            State::ShowStored { cycle }
            | State::ReviewEntities { cycle, .. }
            | State::AwaitManualAdd { cycle, .. }
            | State::Terminal { cycle, .. } => Some(cycle),
        }
    }
}

/// Drives review cycles against a [`FeedbackContext`].
pub struct SessionController {
    context: FeedbackContext,
    engine: Arc<dyn NerEngine>,
    settings: InferenceSettings,
    state: State,
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("engine", &self.engine.name())
            .field("phase", &self.state.phase())
            .finish()
    }
}

impl SessionController {
    pub fn new(
        context: FeedbackContext,
        engine: Arc<dyn NerEngine>,
        settings: InferenceSettings,
    ) -> Self {
        Self {
            context,
            engine,
            settings,
            state: State::Idle,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.state.phase()
    }

    pub fn context(&self) -> &FeedbackContext {
        &self.context
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    fn invalid(&self, event: &'static str) -> FeedbackError {
        FeedbackError::InvalidTransition {
            phase: self.state.phase(),
            event,
        }
    }

    /// Start a cycle for `text`.
    ///
    /// Allowed from `Idle`, `ShowStored` and `Terminal`. Text already in
    /// the entity store is shown without running the model; otherwise
    /// the model runs and the cycle enters `ReviewEntities`, or
    /// `AwaitManualAdd` if nothing was recognized.
    pub fn submit_text(&mut self, text: &str) -> Result<CycleView> {
        match self.state {
            State::Idle | State::ShowStored { .. } | State::Terminal { .. } => {}
            _ => return Err(self.invalid("submit text")),
        }
        if text.trim().is_empty() {
            return Err(FeedbackError::Validation(
                "input text must not be blank".to_string(),
            ));
        }

        let cycle = Cycle::new(text);

        if self.context.entities.contains(text) {
            info!(cycle_id = %cycle.id, "Input has stored corrections, skipping inference");
            self.state = State::ShowStored { cycle };
            return Ok(self.view());
        }

        let labels: Vec<&str> = self.settings.labels.iter().map(String::as_str).collect();
        let raw = self.engine.extract(text, &labels)?;
        let raw_count = raw.len();
        let entities = normalize_spans(raw, self.settings.threshold);
        info!(
            cycle_id = %cycle.id,
            engine = self.engine.name(),
            raw = raw_count,
            entities = entities.len(),
            "Inference complete"
        );

        if entities.is_empty() {
            self.state = State::AwaitManualAdd {
                cycle,
                entities,
                merged: Corrections::new(),
            };
            return Ok(self.view());
        }

        for entity in &entities {
            self.context.preferences.initialize(&entity.text);
        }
        let suggestion = self.suggest(&entities[0].text);
        self.state = State::ReviewEntities {
            cycle,
            entities,
            position: 0,
            suggestion,
            pending: Corrections::new(),
        };
        Ok(self.view())
    }

    fn suggest(&mut self, entity: &str) -> Action {
        let ctx = &mut self.context;
        ctx.preferences
            .choose_action(entity, ctx.exploration.rate(), &mut ctx.rng)
    }

    /// Judge the current entity.
    ///
    /// `entity`, when given, must name the current entity. A non-blank
    /// `correction` is kept for this entity and merged into the entity
    /// store once the last entity is judged.
    pub fn judge(
        &mut self,
        entity: Option<&str>,
        is_correct: bool,
        correction: Option<&str>,
    ) -> Result<JudgmentRecord> {
        let State::ReviewEntities {
            entities, position, ..
        } = &self.state
        else {
            return Err(self.invalid("judge an entity"));
        };
        let current = entities[*position].text.clone();
        if let Some(expected) = entity
            && expected != current
        {
            return Err(FeedbackError::Validation(format!(
                "entity '{expected}' is not under review (current: '{current}')"
            )));
        }

        let action = Action::from_judgment(is_correct);
        let reward = self.context.feedback.record(&current, is_correct);
        let params = self.context.params;
        let scores = self
            .context
            .preferences
            .update(&current, action, reward.value(), params);
        let exploration_rate = self.context.exploration.decay();
        let correction = correction
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        info!(
            entity = %current,
            action = %action,
            reward = reward.value(),
            accept = scores.accept,
            reject = scores.reject,
            exploration_rate,
            "Judgment recorded"
        );

        let next_entity = match &self.state {
            State::ReviewEntities {
                entities, position, ..
            } => entities.get(*position + 1).map(|e| e.text.clone()),
            _ => None,
        };
        let next_suggestion = next_entity.map(|next| self.suggest(&next));

        if let State::ReviewEntities {
            position,
            suggestion,
            pending,
            ..
        } = &mut self.state
        {
            if let Some(c) = &correction {
                pending.insert(current.clone(), c.clone());
            }
            *position += 1;
            if let Some(next) = next_suggestion {
                *suggestion = next;
            }
        }

        if next_suggestion.is_none() {
            self.merge_pending();
        }

        Ok(JudgmentRecord {
            entity: current,
            action,
            reward,
            scores,
            exploration_rate,
            correction,
            phase: self.state.phase(),
        })
    }

    /// Move from a completed review into `AwaitManualAdd`, merging
    /// pending corrections into the entity store.
    fn merge_pending(&mut self) {
        let state = std::mem::replace(&mut self.state, State::Idle);
        let State::ReviewEntities {
            cycle,
            entities,
            pending,
            ..
        } = state
        else {
            self.state = state;
            return;
        };

        let mut merged = Corrections::new();
        for (original, corrected) in pending {
            match self
                .context
                .entities
                .merge_correction(&cycle.input, &original, &corrected)
            {
                Ok(()) => {
                    merged.insert(original, corrected);
                }
                Err(e) => warn!(entity = %original, error = %e, "Skipping correction"),
            }
        }
        debug!(cycle_id = %cycle.id, merged = merged.len(), "Review complete");

        self.state = State::AwaitManualAdd {
            cycle,
            entities,
            merged,
        };
    }

    /// Finish the cycle, optionally adding an entity the model missed.
    ///
    /// A manual entity is merged only when both fields are non-blank.
    /// Then all documents are persisted and the cycle becomes `Terminal`.
    /// Write failures are reported in the summary, not returned.
    pub fn finish(&mut self, manual: Option<ManualEntity>) -> Result<CycleSummary> {
        let State::AwaitManualAdd { cycle, .. } = &self.state else {
            return Err(self.invalid("finish the cycle"));
        };
        let cycle = cycle.clone();

        let mut added = None;
        if let Some(entity) = &manual
            && let Some((text, kind)) = entity.filled()
            && self.context.entities.add_manual(&cycle.input, text, kind)
        {
            debug!(cycle_id = %cycle.id, entity = text, entity_type = kind, "Manual entity added");
            added = Some(ManualEntity::new(text, kind));
        }

        let persist = self.context.persist();
        if !persist.all_ok() {
            warn!(cycle_id = %cycle.id, "Cycle finished with persistence failures");
        }

        let summary = CycleSummary {
            cycle_id: cycle.id,
            input: cycle.input.clone(),
            manual: added,
            corrections: self
                .context
                .entities
                .lookup(&cycle.input)
                .cloned()
                .unwrap_or_default(),
            persist,
            preferences: self.context.preferences.clone(),
            exploration_rate: self.context.exploration.rate(),
        };
        info!(
            cycle_id = %cycle.id,
            corrections = summary.corrections.len(),
            feedback = self.context.feedback.len(),
            "Cycle finished"
        );

        self.state = State::Terminal {
            cycle,
            summary: summary.clone(),
        };
        Ok(summary)
    }

    /// Abandon the current cycle.
    ///
    /// Judgments already recorded stay, and are written out if the
    /// abandoned cycle made any, so nothing is lost on restart.
    pub fn reset(&mut self) -> ResetReport {
        let previous = self.state.phase();
        let judged = match &self.state {
            State::ReviewEntities { position, .. } => *position > 0,
            State::AwaitManualAdd { entities, .. } => !entities.is_empty(),
            _ => false,
        };
        if let Some(cycle) = self.state.cycle() {
            debug!(cycle_id = %cycle.id, from = %previous, judged, "Cycle reset");
        }
        self.state = State::Idle;

        let persist = judged.then(|| self.context.persist());
        if let Some(report) = &persist
            && !report.all_ok()
        {
            warn!("Reset with persistence failures");
        }
        ResetReport { previous, persist }
    }

    /// Current state as seen by clients.
    pub fn view(&self) -> CycleView {
        let cycle = self.state.cycle();
        let mut view = CycleView {
            phase: self.state.phase(),
            cycle_id: cycle.map(|c| c.id),
            input: cycle.map(|c| c.input.clone()),
            started_at: cycle.map(|c| c.started_at),
            entities: Vec::new(),
            prompt: None,
            corrections: Corrections::new(),
            summary: None,
            exploration_rate: self.context.exploration.rate(),
        };

        match &self.state {
            State::Idle => {}
            State::ShowStored { cycle } => {
                view.corrections = self
                    .context
                    .entities
                    .lookup(&cycle.input)
                    .cloned()
                    .unwrap_or_default();
            }
            State::ReviewEntities {
                entities,
                position,
                suggestion,
                pending,
                ..
            } => {
                let entity = entities[*position].clone();
                view.prompt = Some(ReviewPrompt {
                    index: *position,
                    total: entities.len(),
                    scores: self
                        .context
                        .preferences
                        .scores(&entity.text)
                        .unwrap_or_default(),
                    entity,
                    suggested_action: *suggestion,
                });
                view.entities = entities.clone();
                view.corrections = pending.clone();
            }
            State::AwaitManualAdd {
                entities, merged, ..
            } => {
                view.entities = entities.clone();
                view.corrections = merged.clone();
            }
            State::Terminal { summary, .. } => {
                view.summary = Some(summary.clone());
            }
        }
        view
    }
}
