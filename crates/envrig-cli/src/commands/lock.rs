use super::{json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use envrig_core::Engine;
use std::path::Path;

pub fn run(engine: &Engine, project: &Path, check: bool, json_output: bool) -> Result<u8, String> {
    let pb = if json_output {
        indicatif::ProgressBar::hidden()
    } else if check {
        spinner("verifying lock file...")
    } else {
        spinner("resolving providers...")
    };

    let result = if check {
        engine.check_lock(project)
    } else {
        engine.lock(project)
    };
    let lock = match result {
        Ok(lock) => lock,
        Err(e) => {
            spin_fail(&pb, if check { "lock check failed" } else { "lock failed" });
            return Err(e.to_string());
        }
    };

    let path = engine.lock_path(project);
    if json_output {
        let payload = serde_json::json!({
            "status": if check { "verified" } else { "written" },
            "path": path,
            "lock": lock,
        });
        println!("{}", json_pretty(&payload)?);
    } else if check {
        spin_ok(
            &pb,
            &format!("{} is current ({})", path.display(), lock.short_id),
        );
    } else {
        spin_ok(
            &pb,
            &format!(
                "wrote {} ({}, {} provider(s))",
                path.display(),
                lock.short_id,
                lock.providers.len()
            ),
        );
    }
    Ok(EXIT_SUCCESS)
}
