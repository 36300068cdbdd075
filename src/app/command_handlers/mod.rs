use crate::app::cli::{help_text, parse_cli_verb, CliVerb};
use crate::app::command_support::CliContext;

pub mod history;
pub mod patterns;
pub mod providers;
pub mod run;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }
    let ctx = CliContext::from_home()?;
    run_cli_with(&ctx, args)
}

pub fn run_cli_with(ctx: &CliContext, args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    let rest = &args[1..];
    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Providers => providers::cmd_providers(ctx),
        CliVerb::Provider => providers::cmd_provider(ctx, rest),
        CliVerb::Model => providers::cmd_model(ctx, rest),
        CliVerb::Patterns => patterns::cmd_patterns(ctx),
        CliVerb::Pattern => patterns::cmd_pattern(ctx, rest),
        CliVerb::Match => patterns::cmd_match(ctx, rest),
        CliVerb::Run => run::cmd_run(ctx, rest),
        CliVerb::Chain => run::cmd_chain(ctx, rest),
        CliVerb::History => history::cmd_history(ctx),
        CliVerb::Starred => history::cmd_starred(ctx),
        CliVerb::Star => history::cmd_star(ctx, rest),
        CliVerb::Unstar => history::cmd_unstar(ctx, rest),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}
