use super::{colorize_lock_state, join_or_none, json_pretty, EXIT_SUCCESS};
use envrig_core::{Engine, LockStatus};
use std::path::Path;

pub fn run(engine: &Engine, project: &Path, json_output: bool) -> Result<u8, String> {
    let status = engine.status(project).map_err(|e| e.to_string())?;
    if json_output {
        println!("{}", json_pretty(&status)?);
        return Ok(EXIT_SUCCESS);
    }

    println!(
        "descriptor: {} ({})",
        status.descriptor_path.display(),
        status.short_id
    );
    println!("languages:  {}", join_or_none(&status.languages));
    println!("hooks:      {}", join_or_none(&status.hooks_declared));
    if status.git_repository {
        println!("installed:  {}", join_or_none(&status.hooks_installed));
    } else {
        println!("installed:  (not a git repository)");
    }
    if status.dotenv.enabled {
        println!("dotenv:     {}", status.dotenv.filename);
    } else {
        println!("dotenv:     disabled");
    }
    let (state, detail) = match &status.lock {
        LockStatus::Missing => ("missing", None),
        LockStatus::Current => ("current", None),
        LockStatus::Stale(d) => ("stale", Some(d)),
        LockStatus::Invalid(d) => ("invalid", Some(d)),
    };
    match detail {
        Some(d) => println!("lock:       {} ({d})", colorize_lock_state(state)),
        None => println!("lock:       {}", colorize_lock_state(state)),
    }
    Ok(EXIT_SUCCESS)
}
