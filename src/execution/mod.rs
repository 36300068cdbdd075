pub mod executor;
pub mod types;

pub use executor::ChainExecutor;
pub use types::{BatchRun, ChainMetadata, ChainResult, StageOutcome, StageResult};

use crate::guard::InputRejection;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error("Please select a provider and model first.")]
    NoModelSelected,
    #[error("No providers configured. Please run 'fabric --setup' first.{}", detail_suffix(.detail))]
    NoProviders { detail: Option<String> },
    #[error("Input validation failed: {0}")]
    Validation(#[from] InputRejection),
}

fn detail_suffix(detail: &Option<String>) -> String {
    match detail {
        Some(detail) if !detail.trim().is_empty() => format!(" ({})", detail.trim()),
        _ => String::new(),
    }
}
