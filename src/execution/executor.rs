use crate::engine::{CommandRunner, EngineCommand, ModelSelection};
use crate::execution::types::{
    BatchRun, ChainMetadata, ChainResult, StageOutcome, StageResult, NO_OUTPUT_MESSAGE,
};
use crate::execution::ExecutionError;
use crate::guard::{self, PreparedInput};
use crate::history::{ExecutionLogEntry, HistoryStore};
use crate::shared::logging::{EventSink, Level, NullSink};
use crate::shared::time::log_timestamp;
use serde_json::Value;
use std::sync::Arc;

pub const SANITIZED_NOTICE: &str = "Input content was automatically sanitized.";

enum Invocation {
    Output(String),
    Empty,
    Failed(String),
}

/// Runs patterns through the engine one at a time, in order.
///
/// Chain mode halts on a hard failure but carries on past a stage that
/// produced no output; independent mode never halts.
pub struct ChainExecutor {
    runner: Arc<dyn CommandRunner>,
    engine: EngineCommand,
    history: Arc<HistoryStore>,
    sink: Arc<dyn EventSink>,
    clock: fn() -> String,
}

impl ChainExecutor {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        engine: EngineCommand,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            runner,
            engine,
            history,
            sink: Arc::new(NullSink),
            clock: log_timestamp,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> String) -> Self {
        self.clock = clock;
        self
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    /// Interactive "run now". Each pattern sees the prepared input, or in
    /// chain mode the last non-empty output before it.
    pub fn execute_single(
        &self,
        patterns: &[String],
        chain_mode: bool,
        input: &str,
        selection: Option<&ModelSelection>,
    ) -> Result<BatchRun, ExecutionError> {
        let selection = selection.ok_or(ExecutionError::NoModelSelected)?;
        let prepared = self.prepare_input(input)?;

        let mut run = BatchRun::new(selection, chain_mode, (self.clock)());
        if prepared.sanitized {
            run.notices.push(SANITIZED_NOTICE.to_string());
        }
        let mut current_input = prepared.text.clone();

        for (index, pattern) in patterns.iter().enumerate() {
            let stage_input = if chain_mode {
                current_input.clone()
            } else {
                prepared.text.clone()
            };

            match self.invoke(index, pattern, &stage_input, selection) {
                Invocation::Output(output) => {
                    self.record(
                        &mut run.notices,
                        ExecutionLogEntry::new(&run.timestamp, pattern, &stage_input, &output),
                    );
                    if chain_mode {
                        current_input = output.clone();
                    }
                    run.stages.push(StageOutcome::Output {
                        pattern: pattern.clone(),
                        output,
                    });
                }
                Invocation::Empty => run.stages.push(StageOutcome::NoOutput {
                    pattern: pattern.clone(),
                }),
                Invocation::Failed(error) => {
                    run.stages.push(StageOutcome::Failed {
                        pattern: pattern.clone(),
                        error,
                    });
                    if chain_mode {
                        break;
                    }
                }
            }
        }

        Ok(run)
    }

    /// Explicit chain: every stage feeds the next, each attempted stage is
    /// logged, and the first hard failure ends the chain.
    pub fn execute_chain(
        &self,
        patterns: &[String],
        input: &str,
        selection: Option<&ModelSelection>,
    ) -> Result<ChainResult, ExecutionError> {
        let selection = selection.ok_or(ExecutionError::NoModelSelected)?;
        let prepared = self.prepare_input(input)?;

        let mut result = ChainResult {
            sequence: patterns.to_vec(),
            stages: Vec::new(),
            final_output: None,
            metadata: ChainMetadata {
                timestamp: (self.clock)(),
                success: false,
                error: None,
            },
            notices: Vec::new(),
        };
        if prepared.sanitized {
            result.notices.push(SANITIZED_NOTICE.to_string());
        }
        let mut current_input = prepared.text;

        for (index, pattern) in patterns.iter().enumerate() {
            let mut stage = StageResult {
                pattern: pattern.clone(),
                input: current_input.clone(),
                output: None,
                success: false,
                error: None,
            };

            let halt = match self.invoke(index, pattern, &current_input, selection) {
                Invocation::Output(output) => {
                    stage.output = Some(output.clone());
                    stage.success = true;
                    current_input = output;
                    false
                }
                Invocation::Empty => {
                    stage.error = Some(NO_OUTPUT_MESSAGE.to_string());
                    false
                }
                Invocation::Failed(error) => {
                    stage.error = Some(format!("Error executing pattern: {error}"));
                    result.metadata.error = Some(format!(
                        "stage {} ({pattern}) failed: {error}",
                        index + 1
                    ));
                    true
                }
            };

            let logged = stage
                .output
                .clone()
                .or_else(|| stage.error.clone())
                .unwrap_or_default();
            self.record(
                &mut result.notices,
                ExecutionLogEntry::new(&result.metadata.timestamp, pattern, &stage.input, logged),
            );
            result.stages.push(stage);
            if halt {
                break;
            }
        }

        if let Some(last) = result.stages.iter().rev().find(|stage| stage.success) {
            result.final_output = last.output.clone();
            result.metadata.success = true;
        }
        Ok(result)
    }

    fn prepare_input(&self, input: &str) -> Result<PreparedInput, ExecutionError> {
        let prepared = guard::prepare(input).map_err(|rejection| {
            self.sink
                .emit(Level::Error, "input.rejected", &rejection.to_string(), &[]);
            ExecutionError::Validation(rejection)
        })?;
        if prepared.sanitized {
            self.sink
                .emit(Level::Info, "input.sanitized", SANITIZED_NOTICE, &[]);
        }
        Ok(prepared)
    }

    fn invoke(
        &self,
        index: usize,
        pattern: &str,
        input: &str,
        selection: &ModelSelection,
    ) -> Invocation {
        let fields = [
            ("pattern", Value::String(pattern.to_string())),
            ("stage", Value::from(index + 1)),
        ];
        let command = self.engine.pattern(pattern, Some(selection));
        let result = self.runner.run(&command, Some(input), true);

        if !result.success {
            let error = result.stderr.trim().to_string();
            self.sink.emit(Level::Error, "stage.failed", &error, &fields);
            return Invocation::Failed(error);
        }
        let output = result.stdout.trim();
        if output.is_empty() {
            self.sink.emit(
                Level::Warn,
                "stage.no_output",
                &format!("pattern {pattern} generated no output"),
                &fields,
            );
            return Invocation::Empty;
        }
        self.sink
            .emit(Level::Info, "stage.completed", "pattern produced output", &fields);
        Invocation::Output(output.to_string())
    }

    fn record(&self, notices: &mut Vec<String>, entry: ExecutionLogEntry) {
        if let Err(err) = self.history.append(entry) {
            self.sink
                .emit(Level::Warn, "history.persist_failed", &err.to_string(), &[]);
            notices.push(format!("History was not saved: {err}"));
        }
    }
}
