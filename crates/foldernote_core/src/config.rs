//! Environment-driven core configuration.
//!
//! # Responsibility
//! - Resolve database location, logging setup, and hierarchy limits.
//! - Reject malformed values instead of silently falling back.
//!
//! # Invariants
//! - Blank environment values are treated as unset.
//! - `max_tree_depth` is always at least 1.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "FOLDERNOTE_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "FOLDERNOTE_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "FOLDERNOTE_LOG_DIR";
pub const MAX_TREE_DEPTH_ENV: &str = "FOLDERNOTE_MAX_TREE_DEPTH";

const DEFAULT_DB_FILE_NAME: &str = "foldernote.sqlite3";

/// Default maximum folder nesting depth. Root folders are level 1.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 64;

/// Errors from configuration resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Variable is set but cannot be parsed.
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid value `{value}` for {key}: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved core configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Log level passed to `init_logging`.
    pub log_level: String,
    /// Absolute log directory. Logging stays off when `None`.
    pub log_dir: Option<PathBuf>,
    /// Maximum folder nesting depth enforced on create and move.
    pub max_tree_depth: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
        }
    }
}

impl CoreConfig {
    /// Builds configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// Used by `from_env` and by tests that must not touch process state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(path) = read(DB_PATH_ENV) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(level) = read(LOG_LEVEL_ENV) {
            config.log_level = level;
        }
        config.log_dir = read(LOG_DIR_ENV).map(PathBuf::from);
        if let Some(raw) = read(MAX_TREE_DEPTH_ENV) {
            config.max_tree_depth = parse_depth(&raw)?;
        }
        Ok(config)
    }
}

fn parse_depth(raw: &str) -> Result<usize, ConfigError> {
    match raw.parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key: MAX_TREE_DEPTH_ENV,
            value: raw.to_string(),
            reason: "must be at least 1",
        }),
        Ok(depth) => Ok(depth),
        Err(_) => Err(ConfigError::InvalidValue {
            key: MAX_TREE_DEPTH_ENV,
            value: raw.to_string(),
            reason: "expected a positive integer",
        }),
    }
}
