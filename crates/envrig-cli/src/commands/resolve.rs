use super::{json_pretty, EXIT_SUCCESS};
use envrig_core::{Effect, Engine, ResolvedProvider};
use std::path::Path;

pub fn run(engine: &Engine, project: &Path, json_output: bool) -> Result<u8, String> {
    let resolution = engine.resolve(project).map_err(|e| e.to_string())?;

    if json_output {
        let payload = serde_json::json!({
            "descriptor_id": resolution.project.identity.descriptor_id,
            "short_id": resolution.project.identity.short_id,
            "providers": resolution.providers,
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("descriptor: {}", resolution.project.identity.short_id);
    if resolution.providers.is_empty() {
        println!("no providers enabled");
    }
    for provider in &resolution.providers {
        println!("{}", describe(provider));
    }
    Ok(EXIT_SUCCESS)
}

fn describe(provider: &ResolvedProvider) -> String {
    let mut out = format!("{:<9} {}", provider.kind.as_str(), provider.name);
    if let Some(version) = &provider.version {
        out.push_str(&format!("@{version}"));
    }
    for effect in &provider.activation_effects {
        let line = match effect {
            Effect::PrependPath { dir } => format!("path    {}", dir.display()),
            Effect::SetVar { key, value } => format!("set     {key}={value}"),
            Effect::InstallHook { command, .. } => format!("runs    {}", command.join(" ")),
        };
        out.push_str("\n          ");
        out.push_str(&line);
    }
    out
}
