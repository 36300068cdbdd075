use crate::engine::ModelSelection;
use serde::Serialize;

pub const NO_OUTPUT_MESSAGE: &str = "Pattern generated no output";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageResult {
    pub pattern: String,
    pub input: String,
    pub output: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainMetadata {
    pub timestamp: String,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainResult {
    pub sequence: Vec<String>,
    pub stages: Vec<StageResult>,
    pub final_output: Option<String>,
    pub metadata: ChainMetadata,
    /// Non-fatal messages: sanitized input, history write failures.
    pub notices: Vec<String>,
}

impl ChainResult {
    pub fn attempted_patterns(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.pattern.as_str()).collect()
    }
}

/// Per-pattern outcome of a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Output { pattern: String, output: String },
    NoOutput { pattern: String },
    Failed { pattern: String, error: String },
}

impl StageOutcome {
    pub fn pattern(&self) -> &str {
        match self {
            StageOutcome::Output { pattern, .. }
            | StageOutcome::NoOutput { pattern }
            | StageOutcome::Failed { pattern, .. } => pattern,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StageOutcome::Failed { .. })
    }

    pub fn render_markdown(&self) -> String {
        match self {
            StageOutcome::Output { pattern, output } => format!("### {pattern}\n\n{output}"),
            StageOutcome::NoOutput { pattern } => {
                format!("### {pattern}\n\nNo output generated.")
            }
            StageOutcome::Failed { pattern, error } => {
                format!("### {pattern}\n\n❌ Error executing: {error}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRun {
    pub vendor: String,
    pub model: String,
    pub chain_mode: bool,
    pub timestamp: String,
    pub stages: Vec<StageOutcome>,
    pub notices: Vec<String>,
}

impl BatchRun {
    pub fn new(selection: &ModelSelection, chain_mode: bool, timestamp: String) -> Self {
        Self {
            vendor: selection.vendor.clone(),
            model: selection.model.clone(),
            chain_mode,
            timestamp,
            stages: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// Model banner followed by one markdown block per stage.
    pub fn render_markdown(&self) -> Vec<String> {
        let mut blocks = vec![format!("**Using Model:** {} - {}", self.vendor, self.model)];
        blocks.extend(self.stages.iter().map(StageOutcome::render_markdown));
        blocks
    }

    pub fn last_output(&self) -> Option<&str> {
        self.stages.iter().rev().find_map(|stage| match stage {
            StageOutcome::Output { output, .. } => Some(output.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_markdown_starts_with_model_banner() {
        let selection = ModelSelection {
            vendor: "OpenAI".to_string(),
            model: "gpt-4".to_string(),
        };
        let mut run = BatchRun::new(&selection, false, "2024-01-01 00:00:00".to_string());
        run.stages.push(StageOutcome::Output {
            pattern: "summarize".to_string(),
            output: "short".to_string(),
        });
        run.stages.push(StageOutcome::NoOutput {
            pattern: "silent".to_string(),
        });
        run.stages.push(StageOutcome::Failed {
            pattern: "broken".to_string(),
            error: "boom".to_string(),
        });

        assert_eq!(
            run.render_markdown(),
            vec![
                "**Using Model:** OpenAI - gpt-4".to_string(),
                "### summarize\n\nshort".to_string(),
                "### silent\n\nNo output generated.".to_string(),
                "### broken\n\n❌ Error executing: boom".to_string(),
            ]
        );
        assert_eq!(run.last_output(), Some("short"));
    }

    #[test]
    fn stage_outcome_serializes_with_status_tag() {
        let outcome = StageOutcome::NoOutput {
            pattern: "p".to_string(),
        };
        let json = serde_json::to_value(&outcome).expect("json");
        assert_eq!(json["status"], "no_output");
        assert_eq!(json["pattern"], "p");
    }
}
