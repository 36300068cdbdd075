use crate::app::command_support::{
    open_session, parse_args, resolve_selection, CliContext, ParsedArgs,
};
use crate::patterns::join_sections;

const PATTERN_USAGE: &str = "usage: pattern show|validate|create|delete|edit <name> | pattern bulk-edit <field> <value> <name>...";

pub fn cmd_pattern(ctx: &CliContext, args: &[String]) -> Result<String, String> {
    let parsed = parse_args(args)?;
    let Some(action) = parsed.positional.first() else {
        return Err(PATTERN_USAGE.to_string());
    };
    if action == "bulk-edit" {
        return cmd_bulk_edit(ctx, &parsed.positional[1..]);
    }
    let Some(name) = parsed.positional.get(1) else {
        return Err(PATTERN_USAGE.to_string());
    };

    match action.as_str() {
        "show" => {
            let session = open_session(ctx)?;
            let library = session.library();
            let (file, content) = if parsed.user {
                ("user.md", library.user_prompt(name))
            } else {
                ("system.md", library.system_prompt(name))
            };
            content
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("pattern `{name}` has no {file}"))
        }
        "validate" => {
            let session = open_session(ctx)?;
            let validation = session.library().validate(name);
            if validation.valid {
                Ok(validation.message)
            } else {
                Err(validation.message)
            }
        }
        "create" => {
            let mut session = open_session(ctx)?;
            if parsed.content.is_some() {
                resolve_selection(ctx, &mut session)?;
            }
            let validation = session
                .create_pattern(name, parsed.content.as_deref())
                .map_err(|e| e.to_string())?;
            Ok(format!(
                "Pattern '{name}' created successfully.\n{}",
                validation.message
            ))
        }
        "delete" => {
            let session = open_session(ctx)?;
            session.delete_pattern(name).map_err(|e| e.to_string())?;
            Ok(format!("Pattern '{name}' deleted successfully."))
        }
        "edit" => cmd_edit(ctx, name, &parsed),
        other => Err(format!("unknown pattern action `{other}`")),
    }
}

/// Replaces `system.md`, one of its sections, or `user.md` with the
/// `--content` text (stdin when absent).
fn cmd_edit(ctx: &CliContext, name: &str, parsed: &ParsedArgs) -> Result<String, String> {
    let content = match &parsed.content {
        Some(content) => content.clone(),
        None => ctx.read_input()?,
    };
    let session = open_session(ctx)?;

    if parsed.user {
        session
            .library()
            .save_user_prompt(name, &content)
            .map_err(|e| e.to_string())?;
        return Ok(format!("Saved user.md for '{name}'."));
    }

    let content = match &parsed.section {
        None => content,
        Some(title) => {
            let mut sections = session.library().sections(name).map_err(|e| e.to_string())?;
            let section = sections
                .iter_mut()
                .find(|section| section.title.eq_ignore_ascii_case(title))
                .ok_or_else(|| format!("pattern `{name}` has no section `{title}`"))?;
            section.body = content.trim().to_string();
            join_sections(&sections)
        }
    };
    let validation = session
        .save_system_prompt(name, &content)
        .map_err(|e| e.to_string())?;
    Ok(format!("Saved system.md for '{name}'.\n{}", validation.message))
}

fn cmd_bulk_edit(ctx: &CliContext, args: &[String]) -> Result<String, String> {
    let [field, value, names @ ..] = args else {
        return Err(PATTERN_USAGE.to_string());
    };
    if names.is_empty() {
        return Err(PATTERN_USAGE.to_string());
    }
    let session = open_session(ctx)?;
    let outcomes = session.bulk_edit_patterns(names, field, value);
    let report = outcomes
        .iter()
        .map(|outcome| {
            let status = if outcome.ok { "ok" } else { "failed" };
            format!("{}\t{status}\t{}", outcome.pattern, outcome.message)
        })
        .collect::<Vec<_>>()
        .join("\n");
    if outcomes.iter().all(|outcome| outcome.ok) {
        Ok(report)
    } else {
        Err(report)
    }
}

pub fn cmd_match(ctx: &CliContext, args: &[String]) -> Result<String, String> {
    let query = args.join(" ");
    if query.trim().is_empty() {
        return Err("usage: match <query...>".to_string());
    }
    let session = open_session(ctx)?;
    let matches = session.match_patterns(&query);
    if matches.is_empty() {
        return Ok("no matching patterns".to_string());
    }
    Ok(matches
        .iter()
        .map(|descriptor| {
            if descriptor.description.is_empty() {
                descriptor.pattern_name.clone()
            } else {
                format!("{}\t{}", descriptor.pattern_name, descriptor.description)
            }
        })
        .collect::<Vec<_>>()
        .join("\n"))
}
