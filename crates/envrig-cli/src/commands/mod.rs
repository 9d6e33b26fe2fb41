pub mod activate;
pub mod completions;
pub mod doctor;
pub mod exec;
pub mod hooks;
pub mod init;
pub mod lock;
pub mod man_pages;
pub mod resolve;
pub mod shell;
pub mod status;

use envrig_core::{ActivateOptions, ActivationReport, ContextDiff, Engine, MemoryContext};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{stderr, IsTerminal};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_DESCRIPTOR_ERROR: u8 = 2;
pub const EXIT_RESOLVE_ERROR: u8 = 3;
pub const EXIT_ACTIVATION_ERROR: u8 = 4;

/// Set in children spawned by `shell` and `exec` to the descriptor short id.
pub const ACTIVE_VAR: &str = "ENVRIG_ACTIVE";

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    if !stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_lock_state(state: &str) -> String {
    use console::Style;
    match state {
        "current" => Style::new().green().apply_to(state).to_string(),
        "stale" => Style::new().yellow().apply_to(state).to_string(),
        "invalid" => Style::new().red().bold().apply_to(state).to_string(),
        "missing" => Style::new().dim().apply_to(state).to_string(),
        other => other.to_owned(),
    }
}

pub fn join_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".to_owned()
    } else {
        names.join(", ")
    }
}

/// Activate against a snapshot of this process's environment.
///
/// Returns the report and the variables the activation changed.
pub fn activate_process(
    engine: &Engine,
    project: &Path,
    options: ActivateOptions,
) -> Result<(ActivationReport, ContextDiff), String> {
    use envrig_core::ShellContext;

    let mut ctx = MemoryContext::from_process().map_err(|e| format!("activation error: {e}"))?;
    let before = ctx.vars();
    let report = engine
        .activate(project, options, &mut ctx)
        .map_err(|e| e.to_string())?;
    for diagnostic in &report.result.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    let diff = ContextDiff::between(&before, &ctx.vars());
    Ok((report, diff))
}

/// Run `program` with the activation applied on top of the inherited
/// environment and return its exit code.
pub fn run_activated(
    program: &str,
    args: &[String],
    report: &ActivationReport,
    diff: &ContextDiff,
) -> Result<u8, String> {
    let mut cmd = std::process::Command::new(program);
    cmd.args(args);
    for key in &diff.unset {
        cmd.env_remove(key);
    }
    cmd.envs(&diff.set);
    cmd.env(ACTIVE_VAR, &report.short_id);
    debug!(
        "spawning {program} with {} changed variable(s)",
        diff.set.len() + diff.unset.len()
    );
    let status = cmd
        .status()
        .map_err(|e| format!("failed to run '{program}': {e}"))?;
    Ok(status
        .code()
        .map_or(EXIT_FAILURE, |c| u8::try_from(c).unwrap_or(EXIT_FAILURE)))
}
