use crate::config::{ConfigError, ConsolePaths, Preferences};
use crate::session::{Session, SessionError};
use std::io::Read;

/// Where the CLI finds its files; tests point it at a temp directory.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub paths: ConsolePaths,
    pub stdin: Option<String>,
}

impl CliContext {
    pub fn from_home() -> Result<Self, String> {
        Ok(Self {
            paths: ConsolePaths::from_home().map_err(|e| e.to_string())?,
            stdin: None,
        })
    }

    pub fn new(paths: ConsolePaths) -> Self {
        Self { paths, stdin: None }
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn read_input(&self) -> Result<String, String> {
        if let Some(stdin) = &self.stdin {
            return Ok(stdin.clone());
        }
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("failed to read stdin: {e}"))?;
        Ok(buf)
    }
}

/// Opens the session and prints startup warnings to stderr.
pub fn open_session(ctx: &CliContext) -> Result<Session, String> {
    let opened = Session::open(&ctx.paths).map_err(|e| e.to_string())?;
    for warning in &opened.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(opened.session)
}

pub fn load_preferences(ctx: &CliContext) -> Result<Preferences, String> {
    Preferences::load(&ctx.paths.preferences_file()).map_err(|e| e.to_string())
}

pub fn save_preferences(ctx: &CliContext, prefs: &Preferences) -> Result<(), String> {
    prefs
        .save(&ctx.paths.preferences_file())
        .map_err(|e| e.to_string())
}

/// Resolves vendor/model from the engine defaults, then lets saved CLI
/// preferences override them. A missing `.env` is tolerated when the
/// preferences name both vendor and model.
pub fn resolve_selection(ctx: &CliContext, session: &mut Session) -> Result<(), String> {
    let prefs = load_preferences(ctx)?;
    let prefs_complete = prefs.vendor.is_some() && prefs.model.is_some();

    match session.load_configuration() {
        Ok(_) => {}
        Err(SessionError::Config(ConfigError::EnvFileMissing { .. })) if prefs_complete => {}
        Err(err) => return Err(err.to_string()),
    }

    if let Some(vendor) = &prefs.vendor {
        session.select_provider(vendor);
    }
    if let Some(model) = &prefs.model {
        session.select_model(model);
    }
    Ok(())
}

/// Splits `--flag value` pairs and boolean flags from positional args.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedArgs {
    pub positional: Vec<String>,
    pub input: Option<String>,
    pub model: Option<String>,
    pub content: Option<String>,
    pub section: Option<String>,
    pub chain: bool,
    pub user: bool,
}

pub fn parse_args(args: &[String]) -> Result<ParsedArgs, String> {
    let mut parsed = ParsedArgs::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value_for = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--chain" => parsed.chain = true,
            "--user" => parsed.user = true,
            "--input" => parsed.input = Some(value_for("--input")?),
            "--model" => parsed.model = Some(value_for("--model")?),
            "--content" => parsed.content = Some(value_for("--content")?),
            "--section" => parsed.section = Some(value_for("--section")?),
            other if other.starts_with("--") => return Err(format!("unknown option `{other}`")),
            _ => parsed.positional.push(arg.clone()),
        }
    }
    Ok(parsed)
}

pub fn parse_index(raw: &str) -> Result<usize, String> {
    raw.parse::<usize>()
        .map_err(|_| format!("index must be a non-negative integer, got `{raw}`"))
}
