pub mod env;
pub mod paths;
pub mod preferences;
pub mod settings;

pub use env::{load_engine_defaults, EngineDefaults, DEFAULT_CONTEXT_LENGTH};
pub use paths::{default_fabric_root, ConsolePaths, CONSOLE_DIR_NAME, FABRIC_CONFIG_DIR};
pub use preferences::Preferences;
pub use settings::{RuntimeLayout, Settings};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to resolve home directory for fabric config path")]
    HomeDirectoryUnavailable,
    #[error("failed to read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("configuration file not found at {path}")]
    EnvFileMissing { path: String },
    #[error("invalid env file {path}: {source}")]
    Env {
        path: String,
        #[source]
        source: dotenvy::Error,
    },
    #[error("settings validation failed: {0}")]
    Settings(String),
}
