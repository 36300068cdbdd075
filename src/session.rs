//! Per-session orchestrator state: the model selection, provider cache,
//! history, pattern library and executor, wired once and passed around
//! explicitly.

use crate::config::{
    load_engine_defaults, ConfigError, ConsolePaths, EngineDefaults, RuntimeLayout, Settings,
};
use crate::engine::{
    CommandRunner, EngineCommand, MetadataCache, ModelSelection, ProcessRunner, ProviderLookup,
};
use crate::execution::{BatchRun, ChainExecutor, ChainResult, ExecutionError};
use crate::history::{HistoryError, HistorySnapshot, HistoryStore};
use crate::patterns::{
    match_patterns, BulkEditOutcome, DescriptorCatalog, PatternDescriptor, PatternError,
    PatternLibrary, PatternValidation,
};
use crate::shared::logging::{EventSink, FileEventLog, Level};
use serde_json::Value;
use std::sync::Arc;

pub const CREATE_PATTERN_PATTERN: &str = "create_pattern";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Execution(#[from] ExecutionError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// Current vendor/model choice plus the context length from the engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub context_length: String,
}

impl SelectionState {
    pub fn model_selection(&self) -> Option<ModelSelection> {
        match (&self.vendor, &self.model) {
            (Some(vendor), Some(model)) if !vendor.is_empty() && !model.is_empty() => {
                Some(ModelSelection {
                    vendor: vendor.clone(),
                    model: model.clone(),
                })
            }
            _ => None,
        }
    }
}

pub struct Session {
    layout: RuntimeLayout,
    engine: EngineCommand,
    runner: Arc<dyn CommandRunner>,
    cache: MetadataCache,
    history: Arc<HistoryStore>,
    executor: ChainExecutor,
    library: PatternLibrary,
    descriptors: DescriptorCatalog,
    selection: SelectionState,
    input_content: String,
    sink: Arc<dyn EventSink>,
}

/// A freshly opened session and the non-fatal problems met on the way.
pub struct OpenedSession {
    pub session: Session,
    pub warnings: Vec<String>,
}

impl Session {
    /// Opens a session rooted at the user's engine config directory,
    /// spawning real engine processes.
    pub fn open(paths: &ConsolePaths) -> Result<OpenedSession, ConfigError> {
        let settings = Settings::from_path(&paths.settings_file())?;
        settings.validate()?;
        let layout = settings.layout(paths);
        let sink: Arc<dyn EventSink> = Arc::new(FileEventLog::new(&layout.log_file));
        let runner: Arc<dyn CommandRunner> =
            Arc::new(ProcessRunner::new(settings.retry_policy()).with_sink(sink.clone()));
        Ok(Self::assemble(layout, &settings, runner, sink))
    }

    /// Builds a session around an arbitrary runner; reloads history and
    /// descriptor files as part of startup.
    pub fn assemble(
        layout: RuntimeLayout,
        settings: &Settings,
        runner: Arc<dyn CommandRunner>,
        sink: Arc<dyn EventSink>,
    ) -> OpenedSession {
        let engine = EngineCommand::new(settings.engine_binary.clone());
        let cache = MetadataCache::new(runner.clone(), engine.clone())
            .with_ttl_secs(settings.cache_ttl_secs)
            .with_sink(sink.clone());
        let history = Arc::new(HistoryStore::new(&layout.outputs_dir));
        let executor = ChainExecutor::new(runner.clone(), engine.clone(), history.clone())
            .with_sink(sink.clone());
        let library = PatternLibrary::new(&layout.patterns_dir);
        let descriptors = DescriptorCatalog::load_or_empty(
            &layout.descriptions_file,
            &layout.extracts_file,
            sink.as_ref(),
        );

        let mut warnings = Vec::new();
        if let Err(err) = history.reload() {
            sink.emit(Level::Warn, "history.reload_failed", &err.to_string(), &[]);
            warnings.push(format!("Error loading saved outputs: {err}"));
        }

        OpenedSession {
            session: Self {
                layout,
                engine,
                runner,
                cache,
                history,
                executor,
                library,
                descriptors,
                selection: SelectionState {
                    context_length: crate::config::DEFAULT_CONTEXT_LENGTH.to_string(),
                    ..SelectionState::default()
                },
                input_content: String::new(),
                sink,
            },
            warnings,
        }
    }

    pub fn layout(&self) -> &RuntimeLayout {
        &self.layout
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn library(&self) -> &PatternLibrary {
        &self.library
    }

    pub fn descriptors(&self) -> &DescriptorCatalog {
        &self.descriptors
    }

    pub fn providers(&self) -> ProviderLookup {
        self.cache.providers()
    }

    /// Reads the engine `.env` defaults and resolves a usable selection
    /// from the provider listing. Unknown or unset default vendors fall
    /// back to the first listed provider and its first model.
    pub fn load_configuration(&mut self) -> Result<&SelectionState, SessionError> {
        let defaults = load_engine_defaults(&self.layout.env_file)?;
        self.apply_defaults(defaults)
    }

    pub fn apply_defaults(
        &mut self,
        defaults: EngineDefaults,
    ) -> Result<&SelectionState, SessionError> {
        let lookup = self.cache.providers();
        if lookup.catalog.is_empty() {
            return Err(ExecutionError::NoProviders {
                detail: lookup.error,
            }
            .into());
        }

        let known_vendor = defaults
            .vendor
            .as_deref()
            .filter(|vendor| lookup.catalog.contains(vendor));
        let (vendor, model) = match known_vendor {
            Some(vendor) => (vendor.to_string(), defaults.model.clone()),
            None => {
                let first = lookup
                    .catalog
                    .first()
                    .ok_or(ExecutionError::NoProviders { detail: None })?;
                self.sink.emit(
                    Level::Info,
                    "config.fallback",
                    "using first listed provider",
                    &[("vendor", Value::String(first.name.clone()))],
                );
                (first.name.clone(), first.models.first().cloned())
            }
        };

        self.selection = SelectionState {
            vendor: Some(vendor),
            model,
            context_length: defaults.context_length,
        };
        Ok(&self.selection)
    }

    /// Switching to a different vendor clears the model choice.
    pub fn select_provider(&mut self, vendor: &str) {
        if self.selection.vendor.as_deref() != Some(vendor) {
            self.selection.vendor = Some(vendor.to_string());
            self.selection.model = None;
        }
    }

    pub fn select_model(&mut self, model: &str) {
        self.selection.model = Some(model.to_string());
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input_content = text.into();
    }

    pub fn input(&self) -> &str {
        &self.input_content
    }

    /// Runs `patterns` against `input`, or the session input when absent.
    pub fn run_patterns(
        &self,
        patterns: &[String],
        chain_mode: bool,
        input: Option<&str>,
    ) -> Result<BatchRun, ExecutionError> {
        let input = input.unwrap_or(&self.input_content);
        self.executor.execute_single(
            patterns,
            chain_mode,
            input,
            self.selection.model_selection().as_ref(),
        )
    }

    pub fn run_chain(&self, patterns: &[String], input: &str) -> Result<ChainResult, ExecutionError> {
        self.executor
            .execute_chain(patterns, input, self.selection.model_selection().as_ref())
    }

    pub fn match_patterns(&self, query: &str) -> Vec<&PatternDescriptor> {
        match_patterns(
            query,
            &self.descriptors.descriptors,
            Some(&self.descriptors.extracts),
        )
    }

    pub fn star(&self, index: usize, custom_name: Option<&str>) -> Result<bool, HistoryError> {
        self.history.star(index, custom_name)
    }

    pub fn unstar(&self, index: usize) -> Result<bool, HistoryError> {
        self.history.unstar(index)
    }

    pub fn reload_history(&self) -> Result<HistorySnapshot, HistoryError> {
        self.history.reload()
    }

    /// Creates a pattern. Without content the minimal section template is
    /// written; with content the engine's `create_pattern` pattern turns it
    /// into a structured prompt first.
    pub fn create_pattern(
        &self,
        name: &str,
        content: Option<&str>,
    ) -> Result<PatternValidation, SessionError> {
        let validation = match content.filter(|content| !content.trim().is_empty()) {
            None => self.library.create_from_template(name)?,
            Some(content) => {
                let selection = self
                    .selection
                    .model_selection()
                    .ok_or(ExecutionError::NoModelSelected)?;
                let command = self
                    .engine
                    .pattern(CREATE_PATTERN_PATTERN, Some(&selection));
                self.library.create_with(name, || {
                    let result = self.runner.run(&command, Some(content), false);
                    if !result.success {
                        return Err(PatternError::Generation(format!(
                            "Error running create_pattern: {}",
                            result.stderr.trim()
                        )));
                    }
                    let structured = result.stdout.trim();
                    if structured.is_empty() {
                        return Err(PatternError::Generation(
                            "No output received from create_pattern".to_string(),
                        ));
                    }
                    Ok(structured.to_string())
                })?
            }
        };
        self.sink.emit(
            Level::Info,
            "pattern.created",
            &validation.message,
            &[("pattern", Value::String(name.to_string()))],
        );
        Ok(validation)
    }

    pub fn delete_pattern(&self, name: &str) -> Result<(), SessionError> {
        self.library.delete(name)?;
        self.sink.emit(
            Level::Info,
            "pattern.deleted",
            name,
            &[("pattern", Value::String(name.to_string()))],
        );
        Ok(())
    }

    pub fn save_system_prompt(
        &self,
        name: &str,
        content: &str,
    ) -> Result<PatternValidation, SessionError> {
        let validation = self.library.save_system_prompt(name, content)?;
        self.sink.emit(
            Level::Info,
            "pattern.updated",
            &validation.message,
            &[("pattern", Value::String(name.to_string()))],
        );
        Ok(validation)
    }

    pub fn bulk_edit_patterns(
        &self,
        names: &[String],
        field: &str,
        value: &str,
    ) -> Vec<BulkEditOutcome> {
        let outcomes = self.library.bulk_edit(names, field, value);
        for outcome in &outcomes {
            let level = if outcome.ok { Level::Info } else { Level::Warn };
            self.sink.emit(
                level,
                "pattern.bulk_edit",
                &outcome.message,
                &[
                    ("pattern", Value::String(outcome.pattern.clone())),
                    ("field", Value::String(field.to_string())),
                ],
            );
        }
        outcomes
    }
}
