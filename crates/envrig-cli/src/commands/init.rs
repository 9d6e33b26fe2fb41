use super::{json_pretty, EXIT_SUCCESS};
use dialoguer::{Confirm, Select};
use envrig_core::Engine;
use envrig_schema::{get_preset, list_presets, Preset};
use std::io::{stderr, stdin, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn preset_names() -> String {
    list_presets()
        .iter()
        .map(|p| p.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn lookup_template(name: &str) -> Result<&'static Preset, String> {
    get_preset(name)
        .ok_or_else(|| format!("unknown template '{name}' (expected: {})", preset_names()))
}

fn pick_template() -> Result<&'static Preset, String> {
    let presets = list_presets();
    let items: Vec<String> = presets
        .iter()
        .map(|p| format!("{:<8} {}", p.name, p.description))
        .collect();
    let idx = Select::new()
        .with_prompt("template")
        .items(&items)
        .default(0)
        .interact()
        .map_err(|e| format!("prompt failed: {e}"))?;
    Ok(&presets[idx])
}

fn write_atomic(dest: &Path, content: &str) -> Result<(), String> {
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| format!("write temp file: {e}"))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| format!("write temp file: {e}"))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| format!("fsync temp file: {e}"))?;
    tmp.persist(dest)
        .map_err(|e| format!("persist descriptor: {}", e.error))?;
    Ok(())
}

fn ensure_can_write(dest: &Path, force: bool, is_tty: bool) -> Result<(), String> {
    if !dest.exists() || force {
        return Ok(());
    }
    let refusal = format!(
        "refusing to overwrite existing {} (pass --force)",
        dest.display()
    );
    if !is_tty {
        return Err(refusal);
    }
    let overwrite = Confirm::new()
        .with_prompt(format!("overwrite {}?", dest.display()))
        .default(false)
        .interact()
        .map_err(|e| format!("prompt failed: {e}"))?;
    if overwrite {
        Ok(())
    } else {
        Err(refusal)
    }
}

pub fn run(
    engine: &Engine,
    project: &Path,
    template: Option<&str>,
    force: bool,
    json_output: bool,
) -> Result<u8, String> {
    let dest = engine.descriptor_path(project);
    let is_tty = stdin().is_terminal() && stderr().is_terminal();

    let preset = match template {
        Some(name) => lookup_template(name)?,
        None if is_tty => pick_template()?,
        None => {
            return Err(format!(
                "no --template provided and stdin is not a TTY (available: {})",
                preset_names()
            ))
        }
    };
    ensure_can_write(&dest, force, is_tty)?;
    write_atomic(&dest, preset.descriptor)?;

    if json_output {
        let payload = serde_json::json!({
            "status": "written",
            "path": dest,
            "template": preset.name,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("wrote {} from template '{}'", dest.display(), preset.name);
    }
    Ok(EXIT_SUCCESS)
}
