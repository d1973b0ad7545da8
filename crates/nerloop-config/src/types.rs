//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]            # HTTP listener
//! [storage]           # blob store backend and document keys
//! [ner]               # NER engine selection
//! [ner.gazetteer]     # label -> terms for the gazetteer engine
//! [learning]          # preference table hyperparameters
//! [logging]           # log level and JSON file output
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged. Accessors return defaults for
/// missing sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NerloopConfig {
    /// Server configuration.
    pub server: Option<ServerConfig>,

    /// Blob storage configuration.
    pub storage: Option<StorageConfig>,

    /// NER engine configuration.
    pub ner: Option<NerSection>,

    /// Preference learning configuration.
    pub learning: Option<LearningConfig>,

    /// Logging configuration.
    pub logging: Option<LoggingConfig>,
}

impl NerloopConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced wholesale, not merged field by field.
    pub fn merge(&mut self, other: NerloopConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }

        if other.storage.is_some() {
            self.storage = other.storage;
        }

        if other.ner.is_some() {
            self.ner = other.ner;
        }

        if other.learning.is_some() {
            self.learning = other.learning;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Server section, or defaults.
    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    /// Storage section, or defaults.
    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    /// NER section, or defaults.
    pub fn ner(&self) -> NerSection {
        self.ner.clone().unwrap_or_default()
    }

    /// Learning section, or defaults.
    pub fn learning(&self) -> LearningConfig {
        self.learning.clone().unwrap_or_default()
    }

    /// Logging section, or defaults.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Default port for the HTTP API.
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to listen on.
    pub port: u16,
    /// Address to bind to.
    pub bind: String,
    /// Enable request logging.
    pub request_logging: bool,
    /// CORS allowed origins (empty = no CORS).
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            request_logging: true,
            cors_origins: Vec::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Blob store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One file per key under a local directory.
    #[default]
    Fs,
    /// Process memory only (lost on restart).
    Memory,
    /// Google Cloud Storage bucket via the JSON API.
    Gcs,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Fs => write!(f, "fs"),
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::Gcs => write!(f, "gcs"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fs" => Ok(StorageBackend::Fs),
            "memory" => Ok(StorageBackend::Memory),
            "gcs" => Ok(StorageBackend::Gcs),
            other => Err(ConfigError::InvalidValue {
                field: "storage.backend".to_string(),
                reason: format!("unknown backend '{other}' (expected fs, memory or gcs)"),
            }),
        }
    }
}

/// Default key of the corrected-entities document.
pub const DEFAULT_CORRECTED_ENTITIES_KEY: &str = "corrected_entities.json";

/// Default key of the feedback-history document.
pub const DEFAULT_FEEDBACK_HISTORY_KEY: &str = "feedback_history.json";

/// Default key of the (optional) preference-table document.
pub const DEFAULT_PREFERENCE_TABLE_KEY: &str = "preference_table.json";

/// Default env var holding the GCS bearer token.
pub const DEFAULT_GCS_TOKEN_ENV: &str = "GCS_ACCESS_TOKEN";

/// Storage configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which blob store to use.
    pub backend: StorageBackend,
    /// Directory for the `fs` backend. Defaults to the platform data dir.
    pub dir: Option<PathBuf>,
    /// Bucket name for the `gcs` backend.
    pub bucket: Option<String>,
    /// Env var holding the GCS access token.
    pub token_env: String,
    /// Request timeout for remote backends, in seconds.
    pub timeout_secs: u64,
    /// Key of the corrected-entities document.
    pub corrected_entities_key: String,
    /// Key of the feedback-history document.
    pub feedback_history_key: String,
    /// Key of the preference-table document.
    pub preference_table_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            dir: None,
            bucket: None,
            token_env: DEFAULT_GCS_TOKEN_ENV.to_string(),
            timeout_secs: 30,
            corrected_entities_key: DEFAULT_CORRECTED_ENTITIES_KEY.to_string(),
            feedback_history_key: DEFAULT_FEEDBACK_HISTORY_KEY.to_string(),
            preference_table_key: DEFAULT_PREFERENCE_TABLE_KEY.to_string(),
        }
    }
}

impl StorageConfig {
    /// Directory used by the `fs` backend.
    ///
    /// Falls back to `<data dir>/nerloop`, then `./data`.
    pub fn resolved_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.dir {
            return dir.clone();
        }
        dirs::data_dir()
            .map(|d| d.join("nerloop"))
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// Bucket name for the `gcs` backend.
    pub fn require_bucket(&self) -> Result<&str> {
        self.bucket
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "bucket".to_string(),
                context: "[storage]".to_string(),
            })
    }

    /// Read the GCS bearer token from the configured env var.
    pub fn resolve_token(&self) -> Result<String> {
        match std::env::var(&self.token_env) {
            Ok(token) if !token.is_empty() => Ok(token),
            _ => Err(ConfigError::CredentialNotFound {
                backend: self.backend.to_string(),
                env_var: self.token_env.clone(),
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NER Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Which NER engine to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NerEngineKind {
    /// Dictionary lookup over configured terms.
    #[default]
    Gazetteer,
    /// Remote inference endpoint over HTTP.
    Http,
    /// Local GLiNER model (requires the `gliner` feature).
    Gliner,
}

impl std::fmt::Display for NerEngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NerEngineKind::Gazetteer => write!(f, "gazetteer"),
            NerEngineKind::Http => write!(f, "http"),
            NerEngineKind::Gliner => write!(f, "gliner"),
        }
    }
}

/// Default entity labels: brand/product/model detection.
pub fn default_labels() -> Vec<String> {
    vec![
        "BRAND".to_string(),
        "PRODUCT".to_string(),
        "MODEL".to_string(),
    ]
}

/// NER configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NerSection {
    /// Engine to use.
    pub engine: NerEngineKind,
    /// Entity labels to recognize.
    pub labels: Vec<String>,
    /// Minimum confidence for a span to be reported.
    pub threshold: f32,
    /// Inference endpoint for the `http` engine.
    pub endpoint: Option<String>,
    /// Request timeout for the `http` engine, in seconds.
    pub timeout_secs: u64,
    /// ONNX model path for the `gliner` engine.
    pub model_path: Option<PathBuf>,
    /// Tokenizer path for the `gliner` engine.
    pub tokenizer_path: Option<PathBuf>,
    /// Blob key prefix to download model files from before loading.
    pub model_blob_prefix: Option<String>,
    /// Local directory for downloaded model files.
    pub cache_dir: Option<PathBuf>,
    /// Gazetteer terms by label.
    pub gazetteer: BTreeMap<String, Vec<String>>,
}

impl Default for NerSection {
    fn default() -> Self {
        Self {
            engine: NerEngineKind::Gazetteer,
            labels: default_labels(),
            threshold: 0.5,
            endpoint: None,
            timeout_secs: 30,
            model_path: None,
            tokenizer_path: None,
            model_blob_prefix: None,
            cache_dir: None,
            gazetteer: BTreeMap::new(),
        }
    }
}

impl NerSection {
    /// Model cache directory, defaulting to `<cache dir>/nerloop/model`.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.cache_dir {
            return dir.clone();
        }
        dirs::cache_dir()
            .map(|d| d.join("nerloop").join("model"))
            .unwrap_or_else(|| PathBuf::from("model"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Learning Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Preference learning configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Step size of the score update.
    pub learning_rate: f64,
    /// Weight of the entity's current best score in the update target.
    pub discount_factor: f64,
    /// Initial exploration rate.
    pub exploration_rate: f64,
    /// Multiplicative decay applied after every judged entity.
    pub exploration_decay: f64,
    /// Floor of the exploration rate.
    pub min_exploration_rate: f64,
    /// Persist the preference table next to the other documents.
    pub persist_preferences: bool,
    /// Seed for the exploration RNG (random if unset).
    pub seed: Option<u64>,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            exploration_rate: 1.0,
            exploration_decay: 0.99,
            min_exploration_rate: 0.1,
            persist_preferences: false,
            seed: None,
        }
    }
}

impl LearningConfig {
    /// Check that every rate lies in its allowed range.
    pub fn validate(&self) -> Result<()> {
        check_unit("learning_rate", self.learning_rate, false)?;
        // discount_factor == 1 makes the fixed point diverge
        if !(0.0..1.0).contains(&self.discount_factor) {
            return Err(ConfigError::InvalidValue {
                field: "discount_factor".to_string(),
                reason: format!("must be in [0, 1), got {}", self.discount_factor),
            });
        }
        check_unit("exploration_rate", self.exploration_rate, true)?;
        check_unit("exploration_decay", self.exploration_decay, true)?;
        check_unit("min_exploration_rate", self.min_exploration_rate, true)?;
        if self.min_exploration_rate > self.exploration_rate {
            return Err(ConfigError::InvalidValue {
                field: "min_exploration_rate".to_string(),
                reason: format!(
                    "must not exceed exploration_rate ({} > {})",
                    self.min_exploration_rate, self.exploration_rate
                ),
            });
        }
        Ok(())
    }
}

fn check_unit(field: &str, value: f64, allow_zero: bool) -> Result<()> {
    let ok = if allow_zero {
        (0.0..=1.0).contains(&value)
    } else {
        value > 0.0 && value <= 1.0
    };
    if ok {
        Ok(())
    } else {
        let range = if allow_zero { "[0, 1]" } else { "(0, 1]" };
        Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("must be in {range}, got {value}"),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console filter directive (e.g. `"info"`, `"nerloop=debug"`).
    pub level: Option<String>,
    /// Write JSON logs to a daily rolling file.
    pub json_file: bool,
    /// Directory for log files. Defaults to `<config dir>/logs`.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: None,
            json_file: true,
            dir: None,
        }
    }
}
