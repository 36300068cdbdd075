use crate::shared::logging::{EventSink, Level, NullSink};
use serde_json::Value;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("empty command")]
    EmptyCommand,
    #[error("executable not found: {binary}")]
    MissingBinary { binary: String },
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write input to {binary}: {source}")]
    Stdin {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for {binary}: {source}")]
    Wait {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{binary} produced invalid utf-8 on {stream}")]
    Encoding { binary: String, stream: &'static str },
    #[error("{binary} exited with code {exit_code}: {stderr}")]
    NonZeroExit {
        binary: String,
        exit_code: i32,
        stderr: String,
    },
}

impl RunnerError {
    /// Text reported back as `stderr` once retries are exhausted.
    pub fn failure_text(&self) -> String {
        match self {
            RunnerError::NonZeroExit {
                stderr, exit_code, ..
            } => {
                if stderr.trim().is_empty() {
                    format!("process exited with code {exit_code}")
                } else {
                    stderr.clone()
                }
            }
            other => other.to_string(),
        }
    }
}

/// Outcome of one (possibly retried) invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessResult {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Seam between the orchestrator and the operating system. Tests swap in
/// scripted implementations.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &[String], input: Option<&str>, allow_retry: bool) -> ProcessResult;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self, allow_retry: bool) -> u32 {
        if allow_retry {
            self.max_attempts.max(1)
        } else {
            1
        }
    }
}

/// Runs real child processes, blocking the caller for the full duration
/// including backoff sleeps.
#[derive(Clone)]
pub struct ProcessRunner {
    policy: RetryPolicy,
    sink: Arc<dyn EventSink>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl std::fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("policy", &self.policy)
            .finish()
    }
}

impl ProcessRunner {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            sink: Arc::new(NullSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &[String], input: Option<&str>, allow_retry: bool) -> ProcessResult {
        let attempts = self.policy.attempts(allow_retry);
        let command_form = command.join(" ");
        self.sink.emit(
            Level::Info,
            "engine.command",
            &command_form,
            &[("attempts", Value::from(attempts))],
        );

        let mut last_failure = String::new();
        for attempt in 1..=attempts {
            match run_once(command, input) {
                Ok(stdout) => return ProcessResult::ok(stdout),
                Err(err) => {
                    last_failure = err.failure_text();
                    if attempt < attempts {
                        self.sink.emit(
                            Level::Debug,
                            "engine.retry",
                            &err.to_string(),
                            &[
                                ("attempt", Value::from(attempt)),
                                ("command", Value::String(command_form.clone())),
                            ],
                        );
                        thread::sleep(self.policy.backoff);
                    }
                }
            }
        }

        self.sink.emit(
            Level::Error,
            "engine.failed",
            &last_failure,
            &[("command", Value::String(command_form))],
        );
        ProcessResult::failed(last_failure)
    }
}

/// Single attempt: pipes `input` to stdin and returns stdout when the
/// process exits with status 0.
pub fn run_once(command: &[String], input: Option<&str>) -> Result<String, RunnerError> {
    let (binary, args) = command.split_first().ok_or(RunnerError::EmptyCommand)?;

    let mut child = match Command::new(binary)
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(RunnerError::MissingBinary {
                binary: binary.clone(),
            })
        }
        Err(source) => {
            return Err(RunnerError::Spawn {
                binary: binary.clone(),
                source,
            })
        }
    };

    let stdin_writer = match (child.stdin.take(), input) {
        (Some(mut stdin), Some(payload)) => {
            let payload = payload.as_bytes().to_vec();
            Some(thread::spawn(move || -> std::io::Result<()> {
                match stdin.write_all(&payload) {
                    Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                    other => other,
                }
            }))
        }
        _ => None,
    };
    let stdout_reader = child.stdout.take().map(|mut stdout| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            buf
        })
    });
    let stderr_reader = child.stderr.take().map(|mut stderr| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf);
            buf
        })
    });

    let status = child.wait().map_err(|source| RunnerError::Wait {
        binary: binary.clone(),
        source,
    })?;

    if let Some(writer) = stdin_writer {
        let written = writer
            .join()
            .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
        if let Err(source) = written {
            return Err(RunnerError::Stdin {
                binary: binary.clone(),
                source,
            });
        }
    }
    let stdout = stdout_reader
        .map(|reader| reader.join().unwrap_or_default())
        .unwrap_or_default();
    let stderr = stderr_reader
        .map(|reader| reader.join().unwrap_or_default())
        .unwrap_or_default();

    if !status.success() {
        return Err(RunnerError::NonZeroExit {
            binary: binary.clone(),
            exit_code: status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        });
    }

    String::from_utf8(stdout).map_err(|_| RunnerError::Encoding {
        binary: binary.clone(),
        stream: "stdout",
    })
}
