use envrig_schema::{normalize_relative_path, DotenvPolicy};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[error("{}: {message}", .path.display())]
pub struct DotenvParseError {
    pub path: PathBuf,
    /// 1-based line of the first entry that failed to parse, when known.
    pub line: Option<usize>,
    pub message: String,
}

/// What happened to the dotenv file during activation. Never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DotenvOutcome {
    #[default]
    Disabled,
    Missing {
        path: PathBuf,
    },
    Rejected {
        path: PathBuf,
        reason: String,
    },
    Malformed {
        error: DotenvParseError,
    },
    Loaded {
        path: PathBuf,
        entries: Vec<(String, String)>,
    },
}

/// Read the project's dotenv file according to `policy`.
///
/// A malformed file yields no entries at all.
///
/// `$VAR` and `${VAR}` in unquoted or double-quoted values are expanded
/// while parsing: from this process's environment first, then from keys
/// defined earlier in the file. The `ShellContext` being activated is not
/// consulted, so callers activating a context other than the process
/// environment see substitutions against the process.
pub fn load_dotenv(project_root: &Path, policy: &DotenvPolicy) -> DotenvOutcome {
    if !policy.enabled {
        return DotenvOutcome::Disabled;
    }

    let path = project_root.join(&policy.filename);
    let relative = match normalize_relative_path("dotenv.filename", &policy.filename) {
        Ok(relative) => relative,
        Err(e) => {
            return DotenvOutcome::Rejected {
                path,
                reason: e.to_string(),
            }
        }
    };
    let path = project_root.join(relative);

    if path.symlink_metadata().is_err() {
        debug!("dotenv file {} not found, skipping", path.display());
        return DotenvOutcome::Missing { path };
    }

    // Symlinks may still point outside the project.
    let (canonical, root) = match (path.canonicalize(), project_root.canonicalize()) {
        (Ok(c), Ok(r)) => (c, r),
        (Err(e), _) | (_, Err(e)) => {
            return DotenvOutcome::Rejected {
                path,
                reason: format!("cannot resolve path: {e}"),
            }
        }
    };
    if !canonical.starts_with(&root) {
        return DotenvOutcome::Rejected {
            reason: format!("resolves to {}, outside the project root", canonical.display()),
            path,
        };
    }

    let iter = match dotenvy::from_path_iter(&canonical) {
        Ok(iter) => iter,
        Err(e) => {
            return DotenvOutcome::Malformed {
                error: DotenvParseError {
                    path,
                    line: None,
                    message: e.to_string(),
                },
            }
        }
    };

    let mut entries = Vec::new();
    for item in iter {
        match item {
            Ok(pair) => entries.push(pair),
            Err(e) => {
                let line = match &e {
                    dotenvy::Error::LineParse(text, _) => {
                        line_number_of(&canonical, text).or(Some(entries.len() + 1))
                    }
                    _ => None,
                };
                return DotenvOutcome::Malformed {
                    error: DotenvParseError {
                        path,
                        line,
                        message: e.to_string(),
                    },
                };
            }
        }
    }

    debug!("loaded {} entries from {}", entries.len(), path.display());
    DotenvOutcome::Loaded { path, entries }
}

fn line_number_of(path: &Path, offending: &str) -> Option<usize> {
    let content = std::fs::read_to_string(path).ok()?;
    let first = offending.lines().next()?.trim();
    content
        .lines()
        .position(|l| l.trim() == first)
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn enabled(filename: &str) -> DotenvPolicy {
        DotenvPolicy {
            enabled: true,
            filename: filename.to_owned(),
        }
    }

    #[test]
    fn disabled_policy_reads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "FOO=bar\n").unwrap();
        assert_eq!(
            load_dotenv(dir.path(), &DotenvPolicy::disabled()),
            DotenvOutcome::Disabled
        );
    }

    #[test]
    fn missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_dotenv(dir.path(), &enabled(".env")),
            DotenvOutcome::Missing { .. }
        ));
    }

    #[test]
    fn loads_entries_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".env"),
            "# comment\nFOO=bar\n\nexport QUOTED=\"a b\"\nEMPTY=\n",
        )
        .unwrap();
        let DotenvOutcome::Loaded { entries, .. } = load_dotenv(dir.path(), &enabled(".env"))
        else {
            panic!("expected loaded");
        };
        assert_eq!(
            entries,
            vec![
                ("FOO".to_owned(), "bar".to_owned()),
                ("QUOTED".to_owned(), "a b".to_owned()),
                ("EMPTY".to_owned(), String::new()),
            ]
        );
    }

    #[test]
    fn malformed_file_yields_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "GOOD=1\nthis is not valid\nLATER=2\n").unwrap();
        let DotenvOutcome::Malformed { error } = load_dotenv(dir.path(), &enabled(".env")) else {
            panic!("expected malformed");
        };
        assert_eq!(error.line, Some(2));
        assert!(error.to_string().contains(".env"));
    }

    #[test]
    fn escaping_filename_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_dotenv(dir.path(), &enabled("../.env")),
            DotenvOutcome::Rejected { .. }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_outside_root_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        let secret = outside.path().join("secrets");
        fs::write(&secret, "TOKEN=x\n").unwrap();
        let project = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(&secret, project.path().join(".env")).unwrap();
        assert!(matches!(
            load_dotenv(project.path(), &enabled(".env")),
            DotenvOutcome::Rejected { .. }
        ));
    }

    #[test]
    fn substitutes_earlier_keys() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".env"),
            "ENVRIG_DOTENV_BASE=bar\nENVRIG_DOTENV_DERIVED=${ENVRIG_DOTENV_BASE}-x\nLITERAL='${ENVRIG_DOTENV_BASE}'\n",
        )
        .unwrap();
        let DotenvOutcome::Loaded { entries, .. } = load_dotenv(dir.path(), &enabled(".env"))
        else {
            panic!("expected loaded");
        };
        assert_eq!(entries[1].1, "bar-x");
        assert_eq!(entries[2].1, "${ENVRIG_DOTENV_BASE}");
    }
}
