use super::{activate_process, run_activated, ACTIVE_VAR};
use envrig_core::{ActivateOptions, Engine};
use std::path::Path;

pub fn run(engine: &Engine, project: &Path, options: ActivateOptions) -> Result<u8, String> {
    if let Ok(active) = std::env::var(ACTIVE_VAR) {
        return Err(format!(
            "already inside an envrig shell ({active}); exit it first"
        ));
    }
    let (report, diff) = activate_process(engine, project, options)?;
    let program = std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/sh".to_owned());
    eprintln!("envrig: entering {program} for {}", report.short_id);
    run_activated(&program, &[], &report, &diff)
}
