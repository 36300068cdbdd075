use crate::shared::time::now_secs;
use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

/// Destination for structured events. Implementations must never fail the caller.
pub trait EventSink: Send + Sync {
    fn emit(&self, level: Level, event: &str, message: &str, fields: &[(&str, Value)]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _level: Level, _event: &str, _message: &str, _fields: &[(&str, Value)]) {}
}

/// Appends one JSON object per line to a log file.
#[derive(Debug, Clone)]
pub struct FileEventLog {
    path: PathBuf,
}

impl FileEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for FileEventLog {
    fn emit(&self, level: Level, event: &str, message: &str, fields: &[(&str, Value)]) {
        let Ok(line) = render_event_line(level, event, message, fields) else {
            return;
        };
        if let Some(parent) = self.path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(mut file) = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        else {
            return;
        };
        let _ = writeln!(file, "{line}");
    }
}

/// Keeps emitted lines in memory; handy for asserting on events in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<Value>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|line| line.get("event").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, level: Level, event: &str, message: &str, fields: &[(&str, Value)]) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(Value::Object(event_payload(level, event, message, fields)));
        }
    }
}

fn event_payload(level: Level, event: &str, message: &str, fields: &[(&str, Value)]) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert("timestamp".to_string(), Value::from(now_secs()));
    payload.insert("level".to_string(), Value::String(level.as_str().to_string()));
    payload.insert("event".to_string(), Value::String(event.to_string()));
    payload.insert("message".to_string(), Value::String(message.to_string()));
    for (key, value) in fields {
        payload.insert((*key).to_string(), value.clone());
    }
    payload
}

pub fn render_event_line(
    level: Level,
    event: &str,
    message: &str,
    fields: &[(&str, Value)],
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&event_payload(level, event, message, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_event_log_appends_json_lines() {
        let dir = tempdir().expect("tempdir");
        let log = FileEventLog::new(dir.path().join("logs/console.log"));

        log.emit(Level::Info, "cache.refresh", "fetched", &[("providers", Value::from(2))]);
        log.emit(Level::Warn, "stage.no_output", "empty", &[]);

        let raw = fs::read_to_string(log.path()).expect("read log");
        let lines: Vec<Value> = raw
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "cache.refresh");
        assert_eq!(lines[0]["providers"], 2);
        assert_eq!(lines[1]["level"], "warn");
    }

    #[test]
    fn memory_sink_records_event_names_in_order() {
        let sink = MemorySink::default();
        sink.emit(Level::Debug, "a", "", &[]);
        sink.emit(Level::Error, "b", "", &[]);
        assert_eq!(sink.events(), vec!["a".to_string(), "b".to_string()]);
    }
}
