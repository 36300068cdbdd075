use crate::config::ConfigError;
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_CONTEXT_LENGTH: &str = "2048";

/// Defaults the engine's own setup wrote to its `.env` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDefaults {
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub context_length: String,
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            vendor: None,
            model: None,
            context_length: DEFAULT_CONTEXT_LENGTH.to_string(),
        }
    }
}

impl EngineDefaults {
    pub fn from_values(values: &BTreeMap<String, String>) -> Self {
        let non_empty = |key: &str| {
            values
                .get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            vendor: non_empty("DEFAULT_VENDOR"),
            model: non_empty("DEFAULT_MODEL"),
            context_length: non_empty("DEFAULT_MODEL_CONTEXT_LENGTH")
                .unwrap_or_else(|| DEFAULT_CONTEXT_LENGTH.to_string()),
        }
    }
}

/// Reads `KEY=value` pairs without touching the process environment.
pub fn load_engine_defaults(path: &Path) -> Result<EngineDefaults, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::EnvFileMissing {
            path: path.display().to_string(),
        });
    }
    let env_error = |source| ConfigError::Env {
        path: path.display().to_string(),
        source,
    };
    let mut values = BTreeMap::new();
    for item in dotenvy::from_path_iter(path).map_err(env_error)? {
        let (key, value) = item.map_err(env_error)?;
        values.insert(key, value);
    }
    Ok(EngineDefaults::from_values(&values))
}
