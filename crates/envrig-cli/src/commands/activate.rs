use super::{activate_process, json_pretty, EXIT_SUCCESS};
use console::Style;
use envrig_core::{ActivateOptions, ActivationReport, Engine, Shell};
use std::path::Path;

pub fn run(
    engine: &Engine,
    project: &Path,
    shell: Option<&str>,
    options: ActivateOptions,
    json_output: bool,
) -> Result<u8, String> {
    let shell = match shell {
        Some(name) => Shell::parse(name).ok_or_else(|| {
            format!("unknown shell '{name}' (expected: bash, zsh, fish, powershell)")
        })?,
        None => Shell::detect(std::env::var("SHELL").ok().as_deref()),
    };

    let (report, diff) = activate_process(engine, project, options)?;

    if json_output {
        println!("{}", json_pretty(&report)?);
    } else {
        print!("{}", shell.render(&diff));
        eprintln!("{}", summary(&report));
    }
    Ok(EXIT_SUCCESS)
}

fn summary(report: &ActivationReport) -> String {
    let dim = Style::new().dim();
    let toolchains: Vec<String> = report
        .result
        .toolchains
        .iter()
        .map(|t| match &t.version {
            Some(v) => format!("{}@{v}", t.name),
            None => t.name.clone(),
        })
        .collect();
    let mut line = format!(
        "envrig: activated {}",
        Style::new().cyan().apply_to(&report.short_id)
    );
    if !toolchains.is_empty() {
        line.push_str(&format!(" {}", dim.apply_to(toolchains.join(", "))));
    }
    let hooks = report.result.hooks_installed();
    if !hooks.is_empty() {
        line.push_str(&format!(" hooks: {}", dim.apply_to(hooks.join(", "))));
    }
    if !report.result.vars_loaded.is_empty() {
        line.push_str(&format!(
            " dotenv: {} loaded",
            report.result.vars_loaded.len()
        ));
    }
    line
}
