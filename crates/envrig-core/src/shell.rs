use crate::context::{is_var_name, ContextDiff};
use std::fmt::{self, Write};
use tracing::warn;

/// Shells `envrig activate` can emit statements for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

impl Shell {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "bash" | "sh" => Some(Self::Bash),
            "zsh" => Some(Self::Zsh),
            "fish" => Some(Self::Fish),
            "powershell" | "pwsh" => Some(Self::PowerShell),
            _ => None,
        }
    }

    /// Guess from a `$SHELL`-style path, falling back to bash.
    pub fn detect(shell_path: Option<&str>) -> Self {
        shell_path
            .and_then(|p| p.rsplit('/').next())
            .and_then(Self::parse)
            .unwrap_or(Self::Bash)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Zsh => "zsh",
            Self::Fish => "fish",
            Self::PowerShell => "powershell",
        }
    }

    /// Statements that reproduce `diff` in a running shell.
    ///
    /// Output is sorted by variable name, unsets first. Names no shell can
    /// assign are skipped with a warning.
    pub fn render(self, diff: &ContextDiff) -> String {
        let mut out = String::new();
        for key in diff.unset.iter().filter(|k| exportable(k)) {
            let _ = match self {
                Self::Bash | Self::Zsh => writeln!(out, "unset {key}"),
                Self::Fish => writeln!(out, "set -e {key}"),
                Self::PowerShell => {
                    writeln!(out, "Remove-Item Env:{key} -ErrorAction SilentlyContinue")
                }
            };
        }
        for (key, value) in diff.set.iter().filter(|(k, _)| exportable(k)) {
            let _ = match self {
                Self::Bash | Self::Zsh => {
                    writeln!(out, "export {key}=\"{}\"", escape_posix(value))
                }
                Self::Fish => writeln!(out, "set -gx {key} \"{}\"", escape_posix(value)),
                Self::PowerShell => {
                    writeln!(out, "$env:{key} = \"{}\"", escape_powershell(value))
                }
            };
        }
        out
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn exportable(key: &str) -> bool {
    let ok = is_var_name(key);
    if !ok {
        warn!("cannot export {key:?}: not a valid variable name");
    }
    ok
}

/// Escape for a double-quoted POSIX (or fish) string.
fn escape_posix(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
        .replace('`', "\\`")
}

fn escape_powershell(value: &str) -> String {
    value
        .replace('`', "``")
        .replace('"', "`\"")
        .replace('$', "`$")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff() -> ContextDiff {
        let mut diff = ContextDiff::default();
        diff.set.insert("FOO".to_owned(), "bar".to_owned());
        diff.set
            .insert("TRICKY".to_owned(), "a \"b\" $c `d` \\e".to_owned());
        diff.unset.push("OLD".to_owned());
        diff
    }

    #[test]
    fn bash_output() {
        let out = Shell::Bash.render(&diff());
        assert_eq!(
            out,
            "unset OLD\nexport FOO=\"bar\"\nexport TRICKY=\"a \\\"b\\\" \\$c \\`d\\` \\\\e\"\n"
        );
    }

    #[test]
    fn fish_output() {
        let out = Shell::Fish.render(&diff());
        assert!(out.starts_with("set -e OLD\n"));
        assert!(out.contains("set -gx FOO \"bar\"\n"));
    }

    #[test]
    fn powershell_output() {
        let out = Shell::PowerShell.render(&diff());
        assert!(out.contains("Remove-Item Env:OLD"));
        assert!(out.contains("$env:FOO = \"bar\""));
        assert!(out.contains("`$c"));
    }

    #[test]
    fn detect_from_shell_path() {
        assert_eq!(Shell::detect(Some("/usr/bin/fish")), Shell::Fish);
        assert_eq!(Shell::detect(Some("/bin/zsh")), Shell::Zsh);
        assert_eq!(Shell::detect(Some("/bin/tcsh")), Shell::Bash);
        assert_eq!(Shell::detect(None), Shell::Bash);
    }

    #[test]
    fn invalid_names_are_not_rendered() {
        let mut diff = ContextDiff::default();
        diff.set.insert("app.name".to_owned(), "demo".to_owned());
        diff.set.insert("FOO".to_owned(), "bar".to_owned());
        diff.unset.push("bad-name".to_owned());
        for shell in [Shell::Bash, Shell::Fish, Shell::PowerShell] {
            let out = shell.render(&diff);
            assert!(!out.contains("app.name"), "{out}");
            assert!(!out.contains("bad-name"), "{out}");
            assert!(out.contains("FOO"));
        }
    }

    #[test]
    fn empty_diff_renders_nothing() {
        assert!(Shell::Zsh.render(&ContextDiff::default()).is_empty());
    }
}
