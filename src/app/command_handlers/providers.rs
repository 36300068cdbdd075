use crate::app::command_support::{
    load_preferences, open_session, parse_args, save_preferences, CliContext,
};

pub fn cmd_providers(ctx: &CliContext) -> Result<String, String> {
    let session = open_session(ctx)?;
    let lookup = session.providers();
    if let Some(error) = lookup.error {
        return Err(format!("Failed to fetch models: {}", error.trim()));
    }
    if lookup.catalog.is_empty() {
        return Ok("no providers configured".to_string());
    }

    let mut lines = Vec::new();
    for provider in lookup.catalog.iter() {
        lines.push(provider.name.clone());
        if provider.models.is_empty() {
            lines.push("  (no models available)".to_string());
        }
        for model in &provider.models {
            lines.push(format!("  {model}"));
        }
    }
    Ok(lines.join("\n"))
}

fn render_preferences(vendor: Option<&str>, model: Option<&str>) -> String {
    format!(
        "provider={}\nmodel={}",
        vendor.unwrap_or("none"),
        model.unwrap_or("none")
    )
}

pub fn cmd_provider(ctx: &CliContext, args: &[String]) -> Result<String, String> {
    let mut prefs = load_preferences(ctx)?;
    let parsed = parse_args(args)?;
    let Some(vendor) = parsed.positional.first() else {
        return Ok(render_preferences(
            prefs.vendor.as_deref(),
            prefs.model.as_deref(),
        ));
    };

    let session = open_session(ctx)?;
    let lookup = session.providers();
    let Some(models) = lookup.catalog.models(vendor) else {
        let known: Vec<&str> = lookup.catalog.provider_names().collect();
        return Err(format!(
            "unknown provider `{vendor}`; available: {}",
            if known.is_empty() {
                "none".to_string()
            } else {
                known.join(", ")
            }
        ));
    };
    if let Some(model) = &parsed.model {
        if !models.contains(model) {
            return Err(format!("provider `{vendor}` has no model `{model}`"));
        }
    }

    if prefs.vendor.as_deref() != Some(vendor.as_str()) {
        prefs.model = None;
    }
    prefs.vendor = Some(vendor.clone());
    if parsed.model.is_some() {
        prefs.model = parsed.model;
    }
    save_preferences(ctx, &prefs)?;
    Ok(render_preferences(
        prefs.vendor.as_deref(),
        prefs.model.as_deref(),
    ))
}

pub fn cmd_model(ctx: &CliContext, args: &[String]) -> Result<String, String> {
    let mut prefs = load_preferences(ctx)?;
    let Some(model) = args.first() else {
        return Ok(format!("model={}", prefs.model.as_deref().unwrap_or("none")));
    };
    prefs.model = Some(model.clone());
    save_preferences(ctx, &prefs)?;
    Ok(format!("model={model}"))
}
