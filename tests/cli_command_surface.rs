use fabric_console::app::command_handlers::run_cli_with;
use fabric_console::app::command_support::CliContext;
use fabric_console::config::ConsolePaths;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

const FAKE_ENGINE: &str = r#"#!/bin/sh
if [ "$1" = "--listmodels" ]; then
  printf 'Available models:\n\nOpenAI\n\t[1]\tgpt-4\n\t[2]\tgpt-3.5-turbo\nOllama\n\t[3]\tllama3\n'
  exit 0
fi
input=$(cat)
case "$2" in
  upper) printf '%s\n' "$input" | tr 'a-z' 'A-Z' ;;
  silent) ;;
  fail) echo 'pattern failed' 1>&2; exit 3 ;;
  args) echo "$@" ;;
  create_pattern) printf '# IDENTITY and PURPOSE\n%s\n\n# STEPS\n\n# OUTPUT INSTRUCTIONS\n' "$input" ;;
  *) echo "unknown pattern $2" 1>&2; exit 1 ;;
esac
"#;

struct Fixture {
    _dir: TempDir,
    paths: ConsolePaths,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempdir().expect("tempdir");
        let root = dir.path().join("fabric");
        let paths = ConsolePaths::new(&root);
        let engine = dir.path().join("fake-fabric");
        write_script(&engine, FAKE_ENGINE);

        fs::create_dir_all(paths.state_root()).expect("state root");
        fs::create_dir_all(paths.default_patterns_dir()).expect("patterns");
        fs::write(
            paths.settings_file(),
            format!(
                "engine_binary: {}\nmax_attempts: 1\nretry_backoff_ms: 0\n",
                engine.display()
            ),
        )
        .expect("settings");
        Self { _dir: dir, paths }
    }

    fn with_env(self, body: &str) -> Self {
        fs::write(self.paths.env_file(), body).expect("env file");
        self
    }

    fn ctx(&self) -> CliContext {
        CliContext::new(self.paths.clone())
    }

    fn run(&self, parts: &[&str]) -> Result<String, String> {
        self.run_ctx(&self.ctx(), parts)
    }

    fn run_ctx(&self, ctx: &CliContext, parts: &[&str]) -> Result<String, String> {
        run_cli_with(ctx, parts.iter().map(|p| p.to_string()).collect())
    }
}

const OPENAI_ENV: &str = "DEFAULT_VENDOR=OpenAI\nDEFAULT_MODEL=gpt-4\n";

#[test]
fn empty_args_and_help_print_usage() {
    let fixture = Fixture::new();
    let help = fixture.run(&[]).expect("help");
    assert!(help.contains("Commands:"));
    assert_eq!(fixture.run(&["help"]).expect("help"), help);
}

#[test]
fn unknown_verb_is_rejected() {
    let fixture = Fixture::new();
    let err = fixture.run(&["bogus"]).expect_err("unknown verb");
    assert_eq!(err, "unknown command `bogus`");
}

#[test]
fn providers_lists_catalog_from_engine() {
    let fixture = Fixture::new();
    let output = fixture.run(&["providers"]).expect("providers");
    assert_eq!(
        output,
        "OpenAI\n  gpt-4\n  gpt-3.5-turbo\nOllama\n  llama3"
    );
}

#[test]
fn run_uses_env_defaults_and_records_history() {
    let fixture = Fixture::new().with_env(OPENAI_ENV);

    let output = fixture
        .run(&["run", "upper", "--input", "hello world"])
        .expect("run");
    assert!(output.contains("**Using Model:** OpenAI - gpt-4"), "{output}");
    assert!(output.contains("### upper\n\nHELLO WORLD"), "{output}");

    let history = fixture.run(&["history"]).expect("history");
    assert!(history.starts_with("[0] "), "{history}");
    assert!(history.ends_with("upper: HELLO WORLD"), "{history}");
    assert!(fixture.paths.default_outputs_dir().join("output_logs.json").exists());
}

#[test]
fn run_passes_vendor_and_model_to_engine() {
    let fixture = Fixture::new().with_env(OPENAI_ENV);
    let output = fixture
        .run(&["run", "args", "--input", "some text"])
        .expect("run");
    assert!(
        output.contains("--pattern args --vendor OpenAI --model gpt-4"),
        "{output}"
    );
}

#[test]
fn run_reads_stdin_when_no_input_flag() {
    let fixture = Fixture::new().with_env(OPENAI_ENV);
    let ctx = fixture.ctx().with_stdin("from   stdin\n");
    let output = fixture.run_ctx(&ctx, &["run", "upper"]).expect("run");
    assert!(output.contains("warning: Input content was automatically sanitized."));
    assert!(output.contains("FROM STDIN"), "{output}");
}

#[test]
fn run_rejects_invalid_input_before_calling_engine() {
    let fixture = Fixture::new().with_env(OPENAI_ENV);
    let err = fixture
        .run(&["run", "upper", "--input", "   "])
        .expect_err("empty input");
    assert!(err.contains("Input content cannot be empty."), "{err}");
    assert_eq!(fixture.run(&["history"]).expect("history"), "no history");
}

#[test]
fn run_without_env_or_preferences_fails() {
    let fixture = Fixture::new();
    assert!(fixture
        .run(&["run", "upper", "--input", "hello"])
        .is_err());
}

#[test]
fn unknown_default_vendor_falls_back_to_first_provider() {
    let fixture = Fixture::new().with_env("DEFAULT_VENDOR=Nobody\nDEFAULT_MODEL=x\n");
    let output = fixture
        .run(&["run", "upper", "--input", "hello"])
        .expect("run");
    assert!(output.contains("**Using Model:** OpenAI - gpt-4"), "{output}");
}

#[test]
fn independent_run_continues_past_failures() {
    let fixture = Fixture::new().with_env(OPENAI_ENV);
    let output = fixture
        .run(&["run", "fail", "silent", "upper", "--input", "keep going"])
        .expect("run");
    assert!(output.contains("### fail\n\n❌ Error executing: pattern failed"), "{output}");
    assert!(output.contains("### silent\n\nNo output generated."), "{output}");
    assert!(output.contains("### upper\n\nKEEP GOING"), "{output}");
}

#[test]
fn chained_run_stops_at_first_failure() {
    let fixture = Fixture::new().with_env(OPENAI_ENV);
    let output = fixture
        .run(&["run", "--chain", "upper", "fail", "args", "--input", "abc def"])
        .expect("run");
    assert!(output.contains("### upper\n\nABC DEF"));
    assert!(output.contains("### fail"));
    assert!(!output.contains("### args"), "{output}");
}

#[test]
fn chain_reports_stages_and_final_output() {
    let fixture = Fixture::new().with_env(OPENAI_ENV);
    let output = fixture
        .run(&["chain", "silent", "upper", "--input", "chain me"])
        .expect("chain");
    assert!(output.contains("stage 1: silent - Pattern generated no output"), "{output}");
    assert!(output.contains("stage 2: upper - ok"), "{output}");
    assert!(output.ends_with("\n\nCHAIN ME"), "{output}");

    let history = fixture.run(&["history"]).expect("history");
    assert_eq!(history.lines().count(), 2);
}

#[test]
fn chain_failure_halts_and_reports_error() {
    let fixture = Fixture::new().with_env(OPENAI_ENV);
    let err = fixture
        .run(&["chain", "fail", "upper", "--input", "chain me"])
        .expect_err("chain fails");
    assert!(
        err.contains("stage 1: fail - Error executing pattern: pattern failed"),
        "{err}"
    );
    assert!(err.contains("1 pattern(s) not attempted"), "{err}");
    assert!(err.ends_with("chain produced no output"), "{err}");
}

#[test]
fn star_and_unstar_round_trip_through_files() {
    let fixture = Fixture::new().with_env(OPENAI_ENV);
    fixture
        .run(&["run", "upper", "--input", "save this"])
        .expect("run");

    assert_eq!(
        fixture.run(&["star", "0", "my", "favourite"]).expect("star"),
        "Output starred successfully!"
    );
    let starred = fixture.run(&["starred"]).expect("starred");
    assert!(starred.contains("my favourite (upper): SAVE THIS"), "{starred}");
    assert!(fixture
        .paths
        .default_outputs_dir()
        .join("starred_outputs.json")
        .exists());

    assert!(fixture.run(&["star", "7"]).is_err());
    assert!(fixture.run(&["star", "x"]).is_err());

    fixture.run(&["unstar", "0"]).expect("unstar");
    assert_eq!(
        fixture.run(&["starred"]).expect("starred"),
        "no starred outputs"
    );
    assert!(fixture.run(&["unstar", "0"]).is_err());
}

#[test]
fn starring_second_stage_of_same_run_reports_already_starred() {
    let fixture = Fixture::new().with_env(OPENAI_ENV);
    fixture
        .run(&["run", "upper", "args", "--input", "one run"])
        .expect("run");

    assert_eq!(
        fixture.run(&["star", "0"]).expect("star"),
        "Output starred successfully!"
    );
    let again = fixture.run(&["star", "1"]).expect("star");
    assert!(again.contains("already starred"), "{again}");
    assert_eq!(fixture.run(&["starred"]).expect("starred").lines().count(), 1);
}

#[test]
fn pattern_edit_replaces_files_and_sections() {
    let fixture = Fixture::new();
    fixture
        .run(&["pattern", "create", "notes"])
        .expect("create");

    let saved = fixture
        .run(&["pattern", "edit", "notes", "--content", "# IDENTITY\nonly identity"])
        .expect("edit");
    assert_eq!(
        saved,
        "Saved system.md for 'notes'.\nWarning: Missing sections: # STEPS, # OUTPUT"
    );

    fixture
        .run(&["pattern", "edit", "notes", "--content", "# IDENTITY and PURPOSE\n\nYou are an AI assistant designed to take notes.\n\n# STEPS\n\n# OUTPUT INSTRUCTIONS\n"])
        .expect("edit");
    let section = fixture
        .run(&["pattern", "edit", "notes", "--section", "steps", "--content", "- listen"])
        .expect("edit section");
    assert!(section.ends_with("Pattern is valid."), "{section}");
    let shown = fixture.run(&["pattern", "show", "notes"]).expect("show");
    assert!(shown.contains("# STEPS\n\n- listen"), "{shown}");
    assert!(fixture
        .run(&["pattern", "edit", "notes", "--section", "GOAL", "--content", "x"])
        .is_err());

    let ctx = fixture.ctx().with_stdin("INPUT:");
    assert_eq!(
        fixture
            .run_ctx(&ctx, &["pattern", "edit", "notes", "--user"])
            .expect("edit user"),
        "Saved user.md for 'notes'."
    );
    assert_eq!(
        fixture
            .run(&["pattern", "show", "notes", "--user"])
            .expect("show user"),
        "INPUT:"
    );

    let report = fixture
        .run(&["pattern", "bulk-edit", "purpose", "write minutes", "notes"])
        .expect("bulk edit");
    assert_eq!(report, "notes\tok\tUpdated successfully");
    let shown = fixture.run(&["pattern", "show", "notes"]).expect("show");
    assert!(
        shown.contains("You are an AI assistant designed to write minutes."),
        "{shown}"
    );

    let failed = fixture
        .run(&["pattern", "bulk-edit", "tags", "x", "notes"])
        .expect_err("unsupported field");
    assert_eq!(failed, "notes\tfailed\tField tags is not supported.");
}

#[test]
fn pattern_edit_without_system_file_fails() {
    let fixture = Fixture::new();
    fs::create_dir_all(fixture.paths.default_patterns_dir().join("bare")).expect("dir");
    let err = fixture
        .run(&["pattern", "edit", "bare", "--content", "# IDENTITY"])
        .expect_err("missing system.md");
    assert!(err.contains("system.md not found"), "{err}");
}

#[test]
fn provider_preference_overrides_env_defaults() {
    let fixture = Fixture::new().with_env(OPENAI_ENV);

    assert_eq!(
        fixture.run(&["provider"]).expect("show"),
        "provider=none\nmodel=none"
    );
    assert_eq!(
        fixture
            .run(&["provider", "Ollama", "--model", "llama3"])
            .expect("set"),
        "provider=Ollama\nmodel=llama3"
    );
    let output = fixture
        .run(&["run", "upper", "--input", "hello"])
        .expect("run");
    assert!(output.contains("**Using Model:** Ollama - llama3"), "{output}");

    let err = fixture.run(&["provider", "Nobody"]).expect_err("unknown");
    assert!(err.contains("available: OpenAI, Ollama"), "{err}");
    assert!(fixture
        .run(&["provider", "OpenAI", "--model", "llama3"])
        .is_err());
}

#[test]
fn switching_provider_clears_saved_model() {
    let fixture = Fixture::new();
    fixture
        .run(&["provider", "OpenAI", "--model", "gpt-4"])
        .expect("set");
    assert_eq!(
        fixture.run(&["provider", "Ollama"]).expect("switch"),
        "provider=Ollama\nmodel=none"
    );
    assert_eq!(fixture.run(&["model", "llama3"]).expect("model"), "model=llama3");
    assert_eq!(fixture.run(&["model"]).expect("show"), "model=llama3");
}

#[test]
fn complete_preferences_work_without_env_file() {
    let fixture = Fixture::new();
    fixture
        .run(&["provider", "OpenAI", "--model", "gpt-3.5-turbo"])
        .expect("set");
    let output = fixture
        .run(&["run", "upper", "--input", "hello"])
        .expect("run");
    assert!(output.contains("**Using Model:** OpenAI - gpt-3.5-turbo"), "{output}");
}

#[test]
fn pattern_lifecycle_through_cli() {
    let fixture = Fixture::new().with_env(OPENAI_ENV);

    assert_eq!(
        fixture.run(&["patterns"]).expect("list"),
        "no patterns installed"
    );

    let created = fixture
        .run(&["pattern", "create", "summarize"])
        .expect("create");
    assert!(created.starts_with("Pattern 'summarize' created successfully."));
    assert!(fixture
        .run(&["pattern", "create", "summarize"])
        .is_err());

    let generated = fixture
        .run(&["pattern", "create", "haiku", "--content", "Write haiku"])
        .expect("create with content");
    assert!(generated.contains("Pattern is valid."), "{generated}");
    let shown = fixture.run(&["pattern", "show", "haiku"]).expect("show");
    assert!(shown.contains("Write haiku"), "{shown}");

    assert_eq!(
        fixture.run(&["patterns"]).expect("list"),
        "haiku\nsummarize"
    );
    assert_eq!(
        fixture
            .run(&["pattern", "validate", "summarize"])
            .expect("validate"),
        "Pattern is valid."
    );

    fixture
        .run(&["pattern", "delete", "summarize"])
        .expect("delete");
    assert_eq!(fixture.run(&["patterns"]).expect("list"), "haiku");
    assert!(fixture.run(&["pattern", "delete", "summarize"]).is_err());
    assert!(fixture.run(&["pattern", "show"]).is_err());
}

#[test]
fn invalid_pattern_names_are_rejected() {
    let fixture = Fixture::new();
    assert!(fixture
        .run(&["pattern", "create", "../escape"])
        .is_err());
}

#[test]
fn match_ranks_descriptors() {
    let fixture = Fixture::new();
    let descriptions = fixture.paths.default_descriptions_file();
    fs::create_dir_all(descriptions.parent().expect("parent")).expect("mkdir");
    fs::write(
        &descriptions,
        r#"{"patterns":[
            {"patternName":"summarize","description":"Summarize content","tags":["SUMMARIZE"]},
            {"patternName":"create_git_diff_commit","description":"Write a git commit message","tags":["DEVELOPMENT"]}
        ]}"#,
    )
    .expect("descriptions");

    let output = fixture.run(&["match", "git", "commit"]).expect("match");
    assert_eq!(
        output,
        "create_git_diff_commit\tWrite a git commit message"
    );
    assert_eq!(
        fixture.run(&["match", "zzz"]).expect("match"),
        "no matching patterns"
    );
    assert!(fixture.run(&["match"]).is_err());
}
