// Tracker Configuration
//
// Defines where the key-value store lives and the tunables of the goal
// engine (progress cache freshness, streak lookback).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default freshness window for cached goal progress
pub const DEFAULT_PROGRESS_TTL: Duration = Duration::from_secs(3600);

/// Default number of days scanned when computing a streak
pub const DEFAULT_STREAK_LOOKBACK_DAYS: u32 = 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main tracker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaytrackConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub goals: GoalsConfig,
}

/// Which store backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// libSQL database (local file or remote Turso)
    #[default]
    Libsql,

    /// Process-local map, lost on exit
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StoreKind,

    /// Local database file (libsql backend)
    pub path: Option<String>,

    /// Remote database URL (libsql://...)
    pub url: Option<String>,

    /// Auth token for the remote database
    pub token: Option<String>,
}

/// Goal engine tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalsConfig {
    /// How long a cached progress snapshot is served without recomputation (in seconds)
    #[serde(with = "serde_duration", default = "default_progress_ttl")]
    pub progress_ttl: Duration,

    /// Days scanned backwards for streaks; longer streaks are under-reported
    #[serde(default = "default_streak_lookback")]
    pub streak_lookback_days: u32,
}

fn default_progress_ttl() -> Duration {
    DEFAULT_PROGRESS_TTL
}

fn default_streak_lookback() -> u32 {
    DEFAULT_STREAK_LOOKBACK_DAYS
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            progress_ttl: DEFAULT_PROGRESS_TTL,
            streak_lookback_days: DEFAULT_STREAK_LOOKBACK_DAYS,
        }
    }
}

// Custom serde module for Duration (serialize/deserialize as seconds)
mod serde_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

impl DaytrackConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: DaytrackConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ttl = self.goals.progress_ttl;
        if ttl < Duration::from_secs(1) || ttl > Duration::from_secs(86400) {
            return Err(ConfigError::ValidationError(
                "goals: progress_ttl must be between 1 second and 24 hours".to_string(),
            ));
        }

        if self.goals.streak_lookback_days == 0 || self.goals.streak_lookback_days > 3650 {
            return Err(ConfigError::ValidationError(
                "goals: streak_lookback_days must be between 1 and 3650".to_string(),
            ));
        }

        if self.storage.url.is_some() && self.storage.token.is_none() {
            return Err(ConfigError::ValidationError(
                "storage: a remote url requires a token".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }
}
