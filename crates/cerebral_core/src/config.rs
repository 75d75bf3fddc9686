//! Engine configuration.
//!
//! # Responsibility
//! - Load engine settings from an optional JSON file.
//! - Apply `CEREBRAL_*` environment overrides on top.
//! - Build the taxonomy router named by the configuration.
//!
//! # Invariants
//! - A loaded config has passed `validate`.
//! - Unknown JSON keys are rejected so typos do not silently fall back to
//!   defaults.

use crate::engine::EngineSettings;
use crate::logging::{default_log_level, normalize_level};
use crate::taxonomy::config::TaxonomyConfig;
use crate::taxonomy::router::{CatalogError, CollectionRouter};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "CEREBRAL_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "CEREBRAL_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "CEREBRAL_LOG_DIR";
pub const ENV_TAXONOMY_FILE: &str = "CEREBRAL_TAXONOMY_FILE";

const MAX_RECENT_WINDOW_DAYS: u32 = 3_650;

/// Errors raised while loading or validating configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    InvalidValue {
        key: &'static str,
        message: String,
    },
    Catalog(CatalogError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid config document: {err}"),
            Self::InvalidValue { key, message } => write!(f, "invalid `{key}`: {message}"),
            Self::Catalog(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::InvalidValue { .. } => None,
            Self::Catalog(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<CatalogError> for ConfigError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

/// Engine settings as loaded from file and environment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// SQLite database file. `None` lets the caller pick a location.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute directory for rolling log files; `None` disables file logs.
    pub log_dir: Option<PathBuf>,
    /// Replacement taxonomy declaration; `None` uses the built-in tree.
    pub taxonomy_file: Option<PathBuf>,
    pub recent_window_days: u32,
    pub default_page_limit: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            taxonomy_file: None,
            recent_window_days: 7,
            default_page_limit: 20,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON document. Missing keys take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Defaults, optionally overlaid by a file, then by the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `CEREBRAL_*` overrides read through `lookup`, then validates.
    ///
    /// Blank values are ignored.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = read(ENV_DB_PATH) {
            self.db_path = Some(PathBuf::from(value.trim()));
        }
        if let Some(value) = read(ENV_LOG_LEVEL) {
            self.log_level = value.trim().to_string();
        }
        if let Some(value) = read(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(value.trim()));
        }
        if let Some(value) = read(ENV_TAXONOMY_FILE) {
            self.taxonomy_file = Some(PathBuf::from(value.trim()));
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(|message| ConfigError::InvalidValue {
            key: "log_level",
            message,
        })?;
        if let Some(dir) = &self.log_dir {
            if !dir.is_absolute() {
                return Err(ConfigError::InvalidValue {
                    key: "log_dir",
                    message: format!("must be an absolute path, got `{}`", dir.display()),
                });
            }
        }
        if !(1..=MAX_RECENT_WINDOW_DAYS).contains(&self.recent_window_days) {
            return Err(ConfigError::InvalidValue {
                key: "recent_window_days",
                message: format!("must be between 1 and {MAX_RECENT_WINDOW_DAYS}"),
            });
        }
        if self.default_page_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "default_page_limit",
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Builds the router from `taxonomy_file`, or the built-in tree.
    pub fn load_router(&self) -> Result<CollectionRouter, ConfigError> {
        let router = match &self.taxonomy_file {
            Some(path) => {
                let taxonomy = TaxonomyConfig::from_json_file(path).map_err(CatalogError::from)?;
                CollectionRouter::from_config(&taxonomy)?
            }
            None => CollectionRouter::builtin()?,
        };
        Ok(router)
    }

    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            recent_window_days: self.recent_window_days,
            default_page_limit: self.default_page_limit,
        }
    }
}
