//! Config file discovery and layering.
//!
//! Layers, lowest precedence first:
//! 1. `<config dir>/config.toml`, where the config dir is
//!    `$NERLOOP_CONFIG_DIR` or the platform config dir joined with `nerloop`
//! 2. `nerloop.toml` in the project directory (the working directory by default)
//!
//! `nerloop start --config <file>` bypasses discovery entirely and loads
//! a single [`ConfigLayer::Explicit`] file. CLI flags are applied on top
//! by the caller.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{ConfigError, NerloopConfig, Result};

/// Project-local config file name.
const PROJECT_CONFIG_FILE: &str = "nerloop.toml";

/// Config file name inside the config dir.
const USER_CONFIG_FILE: &str = "config.toml";

/// Overrides the config dir. Also moves the default log directory.
pub const CONFIG_DIR_ENV: &str = "NERLOOP_CONFIG_DIR";

/// Where a config layer comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    User,
    Project,
    Explicit,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLayer::User => write!(f, "user"),
            ConfigLayer::Project => write!(f, "project"),
            ConfigLayer::Explicit => write!(f, "explicit"),
        }
    }
}

/// One candidate config file and whether it contributed.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub layer: ConfigLayer,
    pub path: PathBuf,
    pub loaded: bool,
}

/// A layer that exists but could not be used.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ignoring {}: {}", self.path.display(), self.message)
    }
}

/// Merged configuration plus provenance.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: NerloopConfig,
    /// Candidates in precedence order, lowest first.
    pub sources: Vec<ConfigSource>,
    pub warnings: Vec<ConfigWarning>,
}

impl LoadedConfig {
    /// Load exactly one file. Unlike discovery, a broken file is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self {
            config: load_config_file(path)?,
            sources: vec![ConfigSource {
                layer: ConfigLayer::Explicit,
                path: path.to_path_buf(),
                loaded: true,
            }],
            warnings: Vec::new(),
        })
    }

    /// Paths of the layers that were merged.
    pub fn loaded_from(&self) -> impl Iterator<Item = &Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
    }

    fn add_layer(&mut self, layer: ConfigLayer, path: PathBuf) {
        let mut loaded = false;
        if path.is_file() {
            match load_config_file(&path) {
                Ok(parsed) => {
                    self.config.merge(parsed);
                    loaded = true;
                }
                Err(e) => self.warnings.push(ConfigWarning {
                    path: path.clone(),
                    message: e.to_string(),
                }),
            }
        }
        self.sources.push(ConfigSource {
            layer,
            path,
            loaded,
        });
    }
}

/// Discover and merge config layers.
///
/// `project_dir` defaults to the working directory. A layer that is
/// missing is skipped silently; one that fails to parse is skipped with
/// a warning.
pub fn load_config(project_dir: Option<&Path>) -> LoadedConfig {
    load_config_with_options(project_dir, None)
}

/// [`load_config`] with an explicit config dir, bypassing
/// `NERLOOP_CONFIG_DIR` and the platform default.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> LoadedConfig {
    let mut loaded = LoadedConfig::default();

    let user_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_path(),
    };
    if let Some(path) = user_path {
        loaded.add_layer(ConfigLayer::User, path);
    }

    let project_path = match project_dir {
        Some(dir) => dir.join(PROJECT_CONFIG_FILE),
        None => PathBuf::from(PROJECT_CONFIG_FILE),
    };
    loaded.add_layer(ConfigLayer::Project, project_path);

    loaded
}

/// Parse a single config file.
pub fn load_config_file(path: &Path) -> Result<NerloopConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    NerloopConfig::from_toml(&contents)
}

/// The nerloop config dir, if one can be determined.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join("nerloop"))
}

/// `<config dir>/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    use crate::{NerEngineKind, StorageBackend};

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_single_file() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "custom.toml",
            "[ner]\nengine = \"http\"\nendpoint = \"http://localhost:9100/ner\"\n",
        );

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.ner().engine, NerEngineKind::Http);
        assert_eq!(
            config.ner().endpoint.as_deref(),
            Some("http://localhost:9100/ner")
        );
    }

    #[test]
    fn test_missing_and_broken_files_are_errors_when_explicit() {
        let err = LoadedConfig::from_file(Path::new("/nonexistent/nerloop.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));

        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.toml", "[learning\nseed = ");
        assert!(matches!(
            LoadedConfig::from_file(&path).unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_explicit_file_records_its_source() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "e2e.toml", "[storage]\nbackend = \"memory\"\n");

        let loaded = LoadedConfig::from_file(&path).unwrap();
        assert_eq!(loaded.config.storage().backend, StorageBackend::Memory);
        assert_eq!(loaded.sources[0].layer, ConfigLayer::Explicit);
        assert_eq!(loaded.loaded_from().collect::<Vec<_>>(), vec![path.as_path()]);
    }

    #[test]
    fn test_discovery_with_no_files_uses_defaults() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();

        let loaded = load_config_with_options(Some(project.path()), Some(user.path()));
        assert!(loaded.config.storage.is_none());
        assert_eq!(loaded.sources.len(), 2);
        assert_eq!(loaded.loaded_from().count(), 0);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn test_project_layer_overrides_user_layer() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(&user, "config.toml", "[learning]\nseed = 11\n\n[server]\nport = 8080\n");
        write(&project, "nerloop.toml", "[server]\nport = 3000\n");

        let loaded = load_config_with_options(Some(project.path()), Some(user.path()));

        assert_eq!(loaded.config.server().port, 3000);
        assert_eq!(loaded.config.learning().seed, Some(11));
        let layers: Vec<_> = loaded.sources.iter().map(|s| (s.layer, s.loaded)).collect();
        assert_eq!(
            layers,
            vec![(ConfigLayer::User, true), (ConfigLayer::Project, true)]
        );
    }

    #[test]
    fn test_broken_layer_is_skipped_with_warning() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        write(&user, "config.toml", "[storage]\nbackend = \"memory\"\n");
        let broken = write(&project, "nerloop.toml", "[storage]\nbackend = 7\n");

        let loaded = load_config_with_options(Some(project.path()), Some(user.path()));

        assert_eq!(loaded.config.storage().backend, StorageBackend::Memory);
        assert_eq!(loaded.warnings.len(), 1);
        assert_eq!(loaded.warnings[0].path, broken);
        assert!(loaded.warnings[0].to_string().starts_with("ignoring"));
        assert_eq!(loaded.loaded_from().count(), 1);
    }

    #[test]
    fn test_user_config_path_is_under_config_dir() {
        if let (Some(dir), Some(path)) = (config_dir(), user_config_path()) {
            assert_eq!(path, dir.join("config.toml"));
        }
    }
}
