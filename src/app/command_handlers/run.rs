use crate::app::command_support::{
    open_session, parse_args, resolve_selection, CliContext, ParsedArgs,
};

fn input_for(ctx: &CliContext, parsed: &ParsedArgs) -> Result<String, String> {
    match &parsed.input {
        Some(input) => Ok(input.clone()),
        None => ctx.read_input(),
    }
}

pub fn cmd_run(ctx: &CliContext, args: &[String]) -> Result<String, String> {
    let parsed = parse_args(args)?;
    if parsed.positional.is_empty() {
        return Err("usage: run [--chain] [--input <text>] <pattern>...".to_string());
    }
    let mut session = open_session(ctx)?;
    resolve_selection(ctx, &mut session)?;
    let input = input_for(ctx, &parsed)?;

    let run = session
        .run_patterns(&parsed.positional, parsed.chain, Some(&input))
        .map_err(|e| e.to_string())?;

    let mut blocks: Vec<String> = run
        .notices
        .iter()
        .map(|notice| format!("warning: {notice}"))
        .collect();
    blocks.extend(run.render_markdown());
    Ok(blocks.join("\n\n"))
}

pub fn cmd_chain(ctx: &CliContext, args: &[String]) -> Result<String, String> {
    let parsed = parse_args(args)?;
    if parsed.positional.is_empty() {
        return Err("usage: chain [--input <text>] <pattern>...".to_string());
    }
    let mut session = open_session(ctx)?;
    resolve_selection(ctx, &mut session)?;
    let input = input_for(ctx, &parsed)?;

    let result = session
        .run_chain(&parsed.positional, &input)
        .map_err(|e| e.to_string())?;

    let mut lines: Vec<String> = result
        .notices
        .iter()
        .map(|notice| format!("warning: {notice}"))
        .collect();
    for (index, stage) in result.stages.iter().enumerate() {
        let status = match (&stage.output, &stage.error) {
            (Some(_), _) => "ok".to_string(),
            (None, Some(error)) => error.clone(),
            (None, None) => "skipped".to_string(),
        };
        lines.push(format!("stage {}: {} - {status}", index + 1, stage.pattern));
    }
    let skipped = result.sequence.len() - result.stages.len();
    if skipped > 0 {
        lines.push(format!("{skipped} pattern(s) not attempted"));
    }
    match &result.final_output {
        Some(output) => {
            lines.push(String::new());
            lines.push(output.clone());
        }
        None => lines.push("chain produced no output".to_string()),
    }

    if result.metadata.success {
        Ok(lines.join("\n"))
    } else {
        Err(lines.join("\n"))
    }
}
