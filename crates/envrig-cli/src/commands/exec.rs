use super::{activate_process, run_activated};
use envrig_core::{ActivateOptions, Engine};
use std::path::Path;

pub fn run(
    engine: &Engine,
    project: &Path,
    options: ActivateOptions,
    command: &[String],
) -> Result<u8, String> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| "no command given after --".to_owned())?;
    let (report, diff) = activate_process(engine, project, options)?;
    run_activated(program, args, &report, &diff)
}
