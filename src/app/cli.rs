#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Providers,
    Provider,
    Model,
    Patterns,
    Pattern,
    Match,
    Run,
    Chain,
    History,
    Starred,
    Star,
    Unstar,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "providers" => CliVerb::Providers,
        "provider" => CliVerb::Provider,
        "model" => CliVerb::Model,
        "patterns" => CliVerb::Patterns,
        "pattern" => CliVerb::Pattern,
        "match" => CliVerb::Match,
        "run" => CliVerb::Run,
        "chain" => CliVerb::Chain,
        "history" => CliVerb::History,
        "starred" => CliVerb::Starred,
        "star" => CliVerb::Star,
        "unstar" => CliVerb::Unstar,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  providers                              List providers and models from the engine"
            .to_string(),
        "  provider [<name>] [--model <model>]    Show or set the preferred provider".to_string(),
        "  model [<name>]                         Show or set the preferred model".to_string(),
        "  patterns                               List installed patterns".to_string(),
        "  pattern show|validate|delete <name>    Inspect or remove a pattern (show --user)".to_string(),
        "  pattern create <name> [--content <text>]  Create a pattern (template or generated)"
            .to_string(),
        "  pattern edit <name> [--user] [--section <title>] [--content <text>]".to_string(),
        "                                         Replace system.md, one section or user.md"
            .to_string(),
        "  pattern bulk-edit purpose <value> <name>...  Rewrite the purpose line of patterns"
            .to_string(),
        "  match <query...>                       Rank described patterns against a query"
            .to_string(),
        "  run [--chain] [--input <text>] <pattern>...  Run patterns (stdin when no --input)"
            .to_string(),
        "  chain [--input <text>] <pattern>...    Run patterns as a chain with stage report"
            .to_string(),
        "  history                                List execution history".to_string(),
        "  starred                                List starred outputs".to_string(),
        "  star <index> [name...]                 Star a history entry".to_string(),
        "  unstar <index>                         Remove a starred output".to_string(),
    ]
}

pub fn help_text() -> String {
    cli_help_lines().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbs_parse_and_unknown_falls_through() {
        assert_eq!(parse_cli_verb("run"), CliVerb::Run);
        assert_eq!(parse_cli_verb("--help"), CliVerb::Help);
        assert_eq!(parse_cli_verb("launch"), CliVerb::Unknown);
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for verb in [
            "providers", "provider", "model", "patterns", "pattern", "match", "run", "chain",
            "history", "starred", "star", "unstar",
        ] {
            assert!(help.contains(&format!("  {verb}")), "missing {verb}");
        }
    }
}
