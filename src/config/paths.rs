use crate::config::ConfigError;
use std::path::{Path, PathBuf};

pub const FABRIC_CONFIG_DIR: &str = ".config/fabric";
pub const CONSOLE_DIR_NAME: &str = "console";

pub fn default_fabric_root() -> Result<PathBuf, ConfigError> {
    let home = std::env::var_os("HOME").ok_or(ConfigError::HomeDirectoryUnavailable)?;
    Ok(PathBuf::from(home).join(FABRIC_CONFIG_DIR))
}

/// Well-known locations under the engine's per-user config directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolePaths {
    pub fabric_root: PathBuf,
}

impl ConsolePaths {
    pub fn new(fabric_root: impl Into<PathBuf>) -> Self {
        Self {
            fabric_root: fabric_root.into(),
        }
    }

    pub fn from_home() -> Result<Self, ConfigError> {
        Ok(Self::new(default_fabric_root()?))
    }

    pub fn fabric_root(&self) -> &Path {
        &self.fabric_root
    }

    pub fn state_root(&self) -> PathBuf {
        self.fabric_root.join(CONSOLE_DIR_NAME)
    }

    pub fn env_file(&self) -> PathBuf {
        self.fabric_root.join(".env")
    }

    pub fn settings_file(&self) -> PathBuf {
        self.state_root().join("settings.yaml")
    }

    pub fn preferences_file(&self) -> PathBuf {
        self.state_root().join("preferences.yaml")
    }

    pub fn log_file(&self) -> PathBuf {
        self.state_root().join("logs/console.log")
    }

    pub fn default_patterns_dir(&self) -> PathBuf {
        self.fabric_root.join("patterns")
    }

    pub fn default_outputs_dir(&self) -> PathBuf {
        self.fabric_root.join("outputs")
    }

    pub fn default_descriptions_file(&self) -> PathBuf {
        self.fabric_root
            .join("Pattern_Descriptions/pattern_descriptions.json")
    }

    pub fn default_extracts_file(&self) -> PathBuf {
        self.fabric_root
            .join("Pattern_Descriptions/pattern_extracts.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_the_fabric_root() {
        let paths = ConsolePaths::new("/home/u/.config/fabric");
        assert_eq!(paths.env_file(), PathBuf::from("/home/u/.config/fabric/.env"));
        assert_eq!(
            paths.settings_file(),
            PathBuf::from("/home/u/.config/fabric/console/settings.yaml")
        );
        assert_eq!(
            paths.default_outputs_dir(),
            PathBuf::from("/home/u/.config/fabric/outputs")
        );
        assert_eq!(
            paths.log_file(),
            PathBuf::from("/home/u/.config/fabric/console/logs/console.log")
        );
    }
}
