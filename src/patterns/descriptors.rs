use crate::patterns::{io_error, PatternError};
use crate::shared::logging::{EventSink, Level};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDescriptor {
    #[serde(rename = "patternName")]
    pub pattern_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PatternDescriptor {
    pub fn new<I, S>(pattern_name: impl Into<String>, description: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pattern_name: pattern_name.into(),
            description: description.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DescriptionsFile {
    #[serde(default)]
    patterns: Vec<PatternDescriptor>,
}

#[derive(Debug, Deserialize)]
struct ExtractsFile {
    #[serde(default)]
    patterns: Vec<ExtractRecord>,
}

#[derive(Debug, Deserialize)]
struct ExtractRecord {
    #[serde(rename = "patternName", default)]
    pattern_name: String,
    #[serde(default)]
    pattern_extract: String,
}

pub fn load_descriptors(path: &Path) -> Result<Vec<PatternDescriptor>, PatternError> {
    let raw = fs::read_to_string(path).map_err(|err| io_error(path, err))?;
    let file: DescriptionsFile = serde_json::from_str(&raw).map_err(|source| PatternError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    Ok(file.patterns)
}

/// Extract texts keyed by pattern name; records missing either side are skipped.
pub fn load_extracts(path: &Path) -> Result<BTreeMap<String, String>, PatternError> {
    let raw = fs::read_to_string(path).map_err(|err| io_error(path, err))?;
    let file: ExtractsFile = serde_json::from_str(&raw).map_err(|source| PatternError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    Ok(file
        .patterns
        .into_iter()
        .filter(|record| !record.pattern_name.is_empty() && !record.pattern_extract.is_empty())
        .map(|record| (record.pattern_name, record.pattern_extract))
        .collect())
}

/// Descriptors and extracts loaded once at startup. Immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorCatalog {
    pub descriptors: Vec<PatternDescriptor>,
    pub extracts: BTreeMap<String, String>,
}

impl DescriptorCatalog {
    /// Loads both documents; a missing or malformed file degrades to an
    /// empty collection and a logged warning.
    pub fn load_or_empty(
        descriptions_path: &Path,
        extracts_path: &Path,
        sink: &dyn EventSink,
    ) -> Self {
        let descriptors = load_descriptors(descriptions_path).unwrap_or_else(|err| {
            sink.emit(Level::Warn, "descriptors.load_failed", &err.to_string(), &[]);
            Vec::new()
        });
        let extracts = load_extracts(extracts_path).unwrap_or_else(|err| {
            sink.emit(Level::Warn, "extracts.load_failed", &err.to_string(), &[]);
            BTreeMap::new()
        });
        Self {
            descriptors,
            extracts,
        }
    }
}
