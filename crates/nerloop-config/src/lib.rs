//! Configuration system for the nerloop feedback service.
//!
//! Provides TOML-based configuration with:
//! - `[server]`, `[storage]`, `[ner]`, `[learning]` and `[logging]` sections
//! - Config file layering (user config dir + project-local overrides)
//! - Typed defaults so an empty file yields a runnable local setup

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, ConfigLayer, ConfigSource, ConfigWarning, LoadedConfig, config_dir,
    load_config, load_config_file, load_config_with_options, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
