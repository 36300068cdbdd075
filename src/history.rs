//! Durable execution history: every log append and star mutation rewrites
//! both JSON documents before returning.

use crate::shared::fs_atomic::atomic_write_file;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const LOGS_FILE_NAME: &str = "output_logs.json";
pub const STARRED_FILE_NAME: &str = "starred_outputs.json";

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to read history file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode history file {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode history file {path}: {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write history file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub timestamp: String,
    pub pattern_name: String,
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub is_starred: bool,
    #[serde(default)]
    pub custom_name: String,
}

impl ExecutionLogEntry {
    pub fn new(
        timestamp: impl Into<String>,
        pattern_name: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            pattern_name: pattern_name.into(),
            input: input.into(),
            output: output.into(),
            is_starred: false,
            custom_name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySnapshot {
    pub logs: Vec<ExecutionLogEntry>,
    pub starred: Vec<ExecutionLogEntry>,
}

/// Owns the in-memory log and starred collections and is the only writer
/// of their backing files. All mutations hold one lock through persist.
#[derive(Debug)]
pub struct HistoryStore {
    dir: PathBuf,
    state: Mutex<HistorySnapshot>,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            state: Mutex::new(HistorySnapshot::default()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn logs_path(&self) -> PathBuf {
        self.dir.join(LOGS_FILE_NAME)
    }

    pub fn starred_path(&self) -> PathBuf {
        self.dir.join(STARRED_FILE_NAME)
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        self.lock().clone()
    }

    pub fn logs(&self) -> Vec<ExecutionLogEntry> {
        self.lock().logs.clone()
    }

    pub fn starred(&self) -> Vec<ExecutionLogEntry> {
        self.lock().starred.clone()
    }

    /// Appends to the log and persists both collections. The entry stays
    /// in memory even when the write fails.
    pub fn append(&self, entry: ExecutionLogEntry) -> Result<(), HistoryError> {
        let mut state = self.lock();
        state.logs.push(entry);
        self.write_all(&state)
    }

    /// Stars the log entry at `index`. Out-of-range indexes return
    /// `Ok(false)` without touching anything; a timestamp that is already
    /// starred is not added twice.
    pub fn star(&self, index: usize, custom_name: Option<&str>) -> Result<bool, HistoryError> {
        let mut state = self.lock();
        let Some(source) = state.logs.get(index) else {
            return Ok(false);
        };

        let mut entry = source.clone();
        entry.is_starred = true;
        entry.custom_name = match custom_name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Starred Output #{}", state.starred.len() + 1),
        };
        if !state
            .starred
            .iter()
            .any(|starred| starred.timestamp == entry.timestamp)
        {
            state.starred.push(entry);
        }
        self.write_all(&state)?;
        Ok(true)
    }

    /// Removes the starred entry at `index`; out-of-range is a no-op.
    pub fn unstar(&self, index: usize) -> Result<bool, HistoryError> {
        let mut state = self.lock();
        if index >= state.starred.len() {
            return Ok(false);
        }
        state.starred.remove(index);
        self.write_all(&state)?;
        Ok(true)
    }

    pub fn persist(&self) -> Result<(), HistoryError> {
        let state = self.lock();
        self.write_all(&state)
    }

    /// Replaces memory with the files on disk. Missing files count as
    /// empty; any other failure leaves both collections empty.
    pub fn reload(&self) -> Result<HistorySnapshot, HistoryError> {
        let mut state = self.lock();
        let loaded = read_entries(&self.logs_path()).and_then(|logs| {
            read_entries(&self.starred_path()).map(|starred| HistorySnapshot { logs, starred })
        });
        match loaded {
            Ok(snapshot) => {
                *state = snapshot.clone();
                Ok(snapshot)
            }
            Err(err) => {
                *state = HistorySnapshot::default();
                Err(err)
            }
        }
    }

    fn write_all(&self, state: &HistorySnapshot) -> Result<(), HistoryError> {
        write_entries(&self.logs_path(), &state.logs)?;
        write_entries(&self.starred_path(), &state.starred)
    }

    fn lock(&self) -> MutexGuard<'_, HistorySnapshot> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_entries(path: &Path) -> Result<Vec<ExecutionLogEntry>, HistoryError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(HistoryError::Read {
                path: path.display().to_string(),
                source,
            })
        }
    };
    serde_json::from_str(&raw).map_err(|source| HistoryError::Decode {
        path: path.display().to_string(),
        source,
    })
}

fn write_entries(path: &Path, entries: &[ExecutionLogEntry]) -> Result<(), HistoryError> {
    let body = serde_json::to_vec_pretty(entries).map_err(|source| HistoryError::Encode {
        path: path.display().to_string(),
        source,
    })?;
    atomic_write_file(path, &body).map_err(|source| HistoryError::Write {
        path: path.display().to_string(),
        source,
    })
}
