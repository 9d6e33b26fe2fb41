use super::EXIT_SUCCESS;
use clap::Command;
use std::path::{Path, PathBuf};

/// Write `envrig.1` plus one page per subcommand, nested ones included
/// (`envrig-hooks-install.1`).
pub fn run(cmd: Command, dir: &Path) -> Result<u8, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("failed to create {}: {e}", dir.display()))?;
    let mut written = Vec::new();
    let name = cmd.get_name().to_owned();
    write_pages(cmd, &name, dir, &mut written)?;
    println!("wrote {} man page(s) to {}", written.len(), dir.display());
    Ok(EXIT_SUCCESS)
}

fn write_pages(
    cmd: Command,
    page: &str,
    dir: &Path,
    written: &mut Vec<PathBuf>,
) -> Result<(), String> {
    let mut buf = Vec::new();
    clap_mangen::Man::new(cmd.clone())
        .title(page)
        .render(&mut buf)
        .map_err(|e| format!("failed to render {page}: {e}"))?;
    let path = dir.join(format!("{page}.1"));
    std::fs::write(&path, &buf).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    written.push(path);

    for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
        let child = format!("{page}-{}", sub.get_name());
        write_pages(sub.clone(), &child, dir, written)?;
    }
    Ok(())
}
