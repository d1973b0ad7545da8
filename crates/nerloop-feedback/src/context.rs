//! Process-wide feedback state, built once at startup.

use nerloop_config::LearningConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::documents::{DocumentStore, LoadWarning, PersistReport};
use crate::entity_store::EntityStore;
use crate::feedback_log::FeedbackLog;
use crate::preference::{ExplorationSchedule, PreferenceTable, UpdateParams};
use crate::Result;

/// Everything the session controller reads and mutates across cycles.
///
/// Owns the preference table, exploration schedule, feedback log and
/// entity store, plus the documents they persist to.
#[derive(Debug)]
pub struct FeedbackContext {
    pub preferences: PreferenceTable,
    pub exploration: ExplorationSchedule,
    pub params: UpdateParams,
    pub feedback: FeedbackLog,
    pub entities: EntityStore,
    pub rng: StdRng,
    documents: DocumentStore,
    persist_preferences: bool,
}

impl FeedbackContext {
    /// Load persisted documents and build the context.
    ///
    /// Fails only on invalid learning parameters; document problems come
    /// back as warnings.
    pub fn load(
        documents: DocumentStore,
        learning: &LearningConfig,
    ) -> Result<(Self, Vec<LoadWarning>)> {
        learning.validate()?;

        let keys = documents.keys().clone();
        let mut warnings = Vec::new();

        let (entities, w) = documents.load_or_default::<EntityStore>(&keys.corrected_entities);
        warnings.extend(w);
        let (feedback, w) = documents.load_or_default::<FeedbackLog>(&keys.feedback_history);
        warnings.extend(w);

        let preferences = if learning.persist_preferences {
            let (table, w) = documents.load_or_default::<PreferenceTable>(&keys.preference_table);
            warnings.extend(w);
            table
        } else {
            PreferenceTable::new()
        };

        let rng = match learning.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        info!(
            backend = documents.backend_name(),
            inputs = entities.len(),
            feedback = feedback.len(),
            preferences = preferences.len(),
            warnings = warnings.len(),
            "Feedback context loaded"
        );

        Ok((
            Self {
                preferences,
                exploration: ExplorationSchedule::from(learning),
                params: UpdateParams::from(learning),
                feedback,
                entities,
                rng,
                documents,
                persist_preferences: learning.persist_preferences,
            },
            warnings,
        ))
    }

    /// Whether the preference table is persisted alongside the others.
    pub fn persists_preferences(&self) -> bool {
        self.persist_preferences
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Write every persisted document. Each write is independent.
    pub fn persist(&self) -> PersistReport {
        let keys = self.documents.keys();
        PersistReport {
            corrected_entities: self
                .documents
                .save_reported(&keys.corrected_entities, &self.entities),
            feedback_history: self
                .documents
                .save_reported(&keys.feedback_history, &self.feedback),
            preference_table: self.persist_preferences.then(|| {
                self.documents
                    .save_reported(&keys.preference_table, &self.preferences)
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::DocumentKeys;
    use crate::preference::Action;
    use nerloop_storage::{BlobStore, MemoryBlobStore};
    use std::sync::Arc;

    fn documents(store: &Arc<MemoryBlobStore>) -> DocumentStore {
        DocumentStore::new(store.clone(), DocumentKeys::default())
    }

    #[test]
    fn test_load_empty_store_warns_and_writes_placeholders() {
        let store = Arc::new(MemoryBlobStore::new());
        let (ctx, warnings) =
            FeedbackContext::load(documents(&store), &LearningConfig::default()).unwrap();

        assert!(ctx.entities.is_empty());
        assert!(ctx.feedback.is_empty());
        assert_eq!(warnings.len(), 2);
        assert!(store.contains("corrected_entities.json"));
        assert!(store.contains("feedback_history.json"));
        assert!(!store.contains("preference_table.json"));
    }

    #[test]
    fn test_load_existing_documents() {
        let store = Arc::new(MemoryBlobStore::new());
        store
            .put("corrected_entities.json", br#"{"Buy a Galaxy": {"Galaxy": "Galaxy S24"}}"#)
            .unwrap();
        store.put("feedback_history.json", br#"[["Galaxy", -1]]"#).unwrap();

        let (ctx, warnings) =
            FeedbackContext::load(documents(&store), &LearningConfig::default()).unwrap();
        assert!(warnings.is_empty());
        assert!(ctx.entities.contains("Buy a Galaxy"));
        assert_eq!(ctx.feedback.len(), 1);
    }

    #[test]
    fn test_invalid_learning_config_is_rejected() {
        let store = Arc::new(MemoryBlobStore::new());
        let learning = LearningConfig {
            discount_factor: 1.0,
            ..Default::default()
        };
        assert!(FeedbackContext::load(documents(&store), &learning).is_err());
    }

    #[test]
    fn test_preferences_persist_when_enabled() {
        let store = Arc::new(MemoryBlobStore::new());
        let learning = LearningConfig {
            persist_preferences: true,
            seed: Some(3),
            ..Default::default()
        };

        let (mut ctx, _) = FeedbackContext::load(documents(&store), &learning).unwrap();
        let params = ctx.params;
        ctx.preferences.update("Galaxy", Action::Accept, 1.0, params);
        let report = ctx.persist();
        assert!(report.all_ok());
        assert!(report.preference_table.is_some());

        let (reloaded, warnings) = FeedbackContext::load(documents(&store), &learning).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(reloaded.preferences, ctx.preferences);
    }

    #[test]
    fn test_preferences_reset_when_not_persisted() {
        let store = Arc::new(MemoryBlobStore::new());
        store
            .put("preference_table.json", br#"{"Galaxy": {"accept": 1.0, "reject": 0.0}}"#)
            .unwrap();

        let (ctx, _) =
            FeedbackContext::load(documents(&store), &LearningConfig::default()).unwrap();
        assert!(ctx.preferences.is_empty());
        assert!(ctx.persist().preference_table.is_none());
    }
}
