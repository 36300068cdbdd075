use crate::config::{ConfigError, ConsolePaths};
use crate::engine::runner::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::engine::{DEFAULT_CACHE_TTL_SECS, DEFAULT_ENGINE_BINARY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine_binary: String,
    pub patterns_dir: Option<PathBuf>,
    pub outputs_dir: Option<PathBuf>,
    pub descriptions_file: Option<PathBuf>,
    pub extracts_file: Option<PathBuf>,
    pub cache_ttl_secs: i64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine_binary: DEFAULT_ENGINE_BINARY.to_string(),
            patterns_dir: None,
            outputs_dir: None,
            descriptions_file: None,
            extracts_file: None,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff_ms: 1_000,
        }
    }
}

/// Concrete locations after applying settings overrides to the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeLayout {
    pub patterns_dir: PathBuf,
    pub outputs_dir: PathBuf,
    pub descriptions_file: PathBuf,
    pub extracts_file: PathBuf,
    pub env_file: PathBuf,
    pub preferences_file: PathBuf,
    pub log_file: PathBuf,
}

impl Settings {
    /// A missing file yields defaults.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine_binary.trim().is_empty() {
            return Err(ConfigError::Settings(
                "engine_binary must be non-empty".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Settings(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.cache_ttl_secs < 0 {
            return Err(ConfigError::Settings(
                "cache_ttl_secs must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    pub fn layout(&self, paths: &ConsolePaths) -> RuntimeLayout {
        RuntimeLayout {
            patterns_dir: self
                .patterns_dir
                .clone()
                .unwrap_or_else(|| paths.default_patterns_dir()),
            outputs_dir: self
                .outputs_dir
                .clone()
                .unwrap_or_else(|| paths.default_outputs_dir()),
            descriptions_file: self
                .descriptions_file
                .clone()
                .unwrap_or_else(|| paths.default_descriptions_file()),
            extracts_file: self
                .extracts_file
                .clone()
                .unwrap_or_else(|| paths.default_extracts_file()),
            env_file: paths.env_file(),
            preferences_file: paths.preferences_file(),
            log_file: paths.log_file(),
        }
    }
}
