use super::{join_or_none, json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use envrig_core::Engine;
use std::path::Path;

pub fn install(engine: &Engine, project: &Path, json_output: bool) -> Result<u8, String> {
    let report = engine.install_hooks(project).map_err(|e| e.to_string())?;
    if json_output {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }
    if report.hooks.is_empty() && report.changed {
        println!("no hooks declared; removed {}", report.hook_path.display());
    } else if report.hooks.is_empty() {
        println!("no hooks declared");
    } else if report.changed {
        println!(
            "installed {} into {}",
            report.hooks.join(", "),
            report.hook_path.display()
        );
    } else {
        println!("{} already up to date", report.hook_path.display());
    }
    if let Some(legacy) = &report.legacy {
        println!("chaining existing hook {}", legacy.display());
    }
    Ok(EXIT_SUCCESS)
}

pub fn uninstall(engine: &Engine, project: &Path, json_output: bool) -> Result<u8, String> {
    let removed = engine.uninstall_hooks(project).map_err(|e| e.to_string())?;
    if json_output {
        println!(
            "{}",
            json_pretty(&serde_json::json!({ "removed": removed }))?
        );
    } else if removed {
        println!("removed envrig pre-commit hook");
    } else {
        println!("no envrig pre-commit hook installed");
    }
    Ok(EXIT_SUCCESS)
}

/// Exits non-zero when the installed hooks differ from the declared ones.
pub fn status(engine: &Engine, project: &Path, json_output: bool) -> Result<u8, String> {
    let status = engine.status(project).map_err(|e| e.to_string())?;
    if !status.git_repository {
        return Err(format!("{} is not inside a git repository", project.display()));
    }
    let in_sync = status.hooks_declared == status.hooks_installed;

    if json_output {
        let payload = serde_json::json!({
            "declared": status.hooks_declared,
            "installed": status.hooks_installed,
            "in_sync": in_sync,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("declared:  {}", join_or_none(&status.hooks_declared));
        println!("installed: {}", join_or_none(&status.hooks_installed));
        if !in_sync {
            println!("run 'envrig hooks install' to update");
        }
    }
    Ok(if in_sync { EXIT_SUCCESS } else { EXIT_FAILURE })
}
