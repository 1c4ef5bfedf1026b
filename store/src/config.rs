//! Configuration management for the store.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Store configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the SQLite database file
    pub database_path: PathBuf,
    /// How long a statement waits on a locked database
    pub busy_timeout: Duration,
    /// Stamp imported records that carry no `modified` with the import time
    pub restamp_missing_modified: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = lookup("DATABASE_PATH")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingDatabasePath)?;

        let busy_timeout_ms: u64 = lookup("BUSY_TIMEOUT_MS")
            .unwrap_or_else(|| "5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidBusyTimeout)?;

        let restamp_missing_modified = match lookup("RESTAMP_MISSING_MODIFIED") {
            None => true,
            Some(value) => parse_flag(&value)
                .ok_or(ConfigError::InvalidFlag("RESTAMP_MISSING_MODIFIED"))?,
        };

        Ok(Self {
            database_path,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            restamp_missing_modified,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_PATH environment variable is required")]
    MissingDatabasePath,

    #[error("Invalid BUSY_TIMEOUT_MS value")]
    InvalidBusyTimeout,

    #[error("Invalid {0} value")]
    InvalidFlag(&'static str),
}
