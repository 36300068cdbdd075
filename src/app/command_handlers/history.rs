use crate::app::command_support::{open_session, parse_index, CliContext};
use crate::history::ExecutionLogEntry;

const PREVIEW_CHARS: usize = 60;

fn preview(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}...")
}

fn render_entries(entries: &[ExecutionLogEntry], starred: bool) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let label = if starred {
                format!("{} ({})", entry.custom_name, entry.pattern_name)
            } else {
                entry.pattern_name.clone()
            };
            format!(
                "[{index}] {} {label}: {}",
                entry.timestamp,
                preview(&entry.output)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn cmd_history(ctx: &CliContext) -> Result<String, String> {
    let session = open_session(ctx)?;
    let logs = session.history().logs();
    if logs.is_empty() {
        return Ok("no history".to_string());
    }
    Ok(render_entries(&logs, false))
}

pub fn cmd_starred(ctx: &CliContext) -> Result<String, String> {
    let session = open_session(ctx)?;
    let starred = session.history().starred();
    if starred.is_empty() {
        return Ok("no starred outputs".to_string());
    }
    Ok(render_entries(&starred, true))
}

pub fn cmd_star(ctx: &CliContext, args: &[String]) -> Result<String, String> {
    let Some(raw_index) = args.first() else {
        return Err("usage: star <index> [name...]".to_string());
    };
    let index = parse_index(raw_index)?;
    let name = args[1..].join(" ");
    let session = open_session(ctx)?;
    let before = session.history().starred().len();
    let starred = session
        .star(index, Some(name.as_str()).filter(|name| !name.is_empty()))
        .map_err(|e| e.to_string())?;
    if !starred {
        return Err(format!("no history entry at index {index}"));
    }
    if session.history().starred().len() == before {
        return Ok(format!(
            "Output {index} is already starred (entries from one run share a timestamp)."
        ));
    }
    Ok("Output starred successfully!".to_string())
}

pub fn cmd_unstar(ctx: &CliContext, args: &[String]) -> Result<String, String> {
    let Some(raw_index) = args.first() else {
        return Err("usage: unstar <index>".to_string());
    };
    let index = parse_index(raw_index)?;
    let session = open_session(ctx)?;
    if session.unstar(index).map_err(|e| e.to_string())? {
        Ok(format!("Removed starred output {index}."))
    } else {
        Err(format!("no starred output at index {index}"))
    }
}
