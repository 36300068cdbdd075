//! Invocation contract of the external engine binary and the plumbing
//! around it: process execution with retries, model listing parsing and
//! the TTL cache in front of it.

pub mod cache;
pub mod catalog;
pub mod runner;

pub use cache::{MetadataCache, ProviderLookup, DEFAULT_CACHE_TTL_SECS};
pub use catalog::{parse_listing, ProviderCatalog, ProviderModels};
pub use runner::{CommandRunner, ProcessResult, ProcessRunner, RetryPolicy, RunnerError};

pub const DEFAULT_ENGINE_BINARY: &str = "fabric";

/// Vendor and model picked by the user; both must be present before any
/// pattern is sent to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub vendor: String,
    pub model: String,
}

/// Builds argv vectors for the engine binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    binary: String,
}

impl Default for EngineCommand {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_BINARY)
    }
}

impl EngineCommand {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn list_models(&self) -> Vec<String> {
        vec![self.binary.clone(), "--listmodels".to_string()]
    }

    pub fn pattern(&self, pattern: &str, selection: Option<&ModelSelection>) -> Vec<String> {
        let mut args = vec![
            self.binary.clone(),
            "--pattern".to_string(),
            pattern.to_string(),
        ];
        if let Some(selection) = selection {
            args.push("--vendor".to_string());
            args.push(selection.vendor.clone());
            args.push("--model".to_string());
            args.push(selection.model.clone());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_command_appends_vendor_and_model_when_selected() {
        let engine = EngineCommand::new("fabric");
        assert_eq!(
            engine.pattern("summarize", None),
            vec!["fabric", "--pattern", "summarize"]
        );

        let selection = ModelSelection {
            vendor: "OpenAI".to_string(),
            model: "gpt-4".to_string(),
        };
        assert_eq!(
            engine.pattern("summarize", Some(&selection)),
            vec![
                "fabric",
                "--pattern",
                "summarize",
                "--vendor",
                "OpenAI",
                "--model",
                "gpt-4"
            ]
        );
    }

    #[test]
    fn list_models_command_uses_configured_binary() {
        assert_eq!(
            EngineCommand::new("/opt/bin/fabric").list_models(),
            vec!["/opt/bin/fabric", "--listmodels"]
        );
        assert_eq!(EngineCommand::default().binary(), "fabric");
    }
}
