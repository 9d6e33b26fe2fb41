use super::EXIT_SUCCESS;
use clap::Command;
use clap_complete::Shell;
use std::io::Write;

/// Print the completion script for `shell` on stdout, to be sourced from the
/// same rc file that runs `eval "$(envrig activate)"`.
pub fn run(mut cmd: Command, shell: Shell) -> Result<u8, String> {
    let mut out = std::io::stdout().lock();
    write_completions(&mut cmd, shell, &mut out);
    out.flush()
        .map_err(|e| format!("failed to write completions: {e}"))?;
    Ok(EXIT_SUCCESS)
}

fn write_completions(cmd: &mut Command, shell: Shell, out: &mut dyn Write) {
    let bin = cmd
        .get_bin_name()
        .unwrap_or_else(|| cmd.get_name())
        .to_owned();
    clap_complete::generate(shell, cmd, bin, out);
}
