pub mod descriptors;
pub mod library;
pub mod matcher;

pub use descriptors::{load_descriptors, load_extracts, DescriptorCatalog, PatternDescriptor};
pub use library::{
    join_sections, split_sections, BulkEditOutcome, PatternLibrary, PatternSection,
    PatternValidation, MINIMAL_TEMPLATE, PURPOSE_FIELD, SYSTEM_FILE, USER_FILE,
};
pub use matcher::{match_patterns, rank_patterns, score_pattern, MatchResult};

#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("invalid pattern name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("pattern directory not found: {path}")]
    DirectoryMissing { path: String },
    #[error("pattern `{0}` already exists")]
    AlreadyExists(String),
    #[error("pattern `{0}` does not exist")]
    NotFound(String),
    #[error("system.md not found for pattern `{0}`")]
    MissingSystemFile(String),
    #[error("pattern generation failed: {0}")]
    Generation(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid json in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub(crate) fn io_error(path: &std::path::Path, source: std::io::Error) -> PatternError {
    PatternError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Pattern names double as directory names, so only ASCII letters,
/// digits, '-' and '_' are accepted.
pub fn validate_pattern_name(name: &str) -> Result<(), PatternError> {
    let invalid = |reason: &str| PatternError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("pattern name cannot be empty"));
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    {
        return Err(invalid("use only ASCII letters, digits, '-' or '_'"));
    }
    Ok(())
}
