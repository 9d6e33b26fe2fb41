use crate::ActivationError;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const HOOK_NAME: &str = "pre-commit";
const LEGACY_HOOK_NAME: &str = "pre-commit.legacy";

const MARKER: &str = "# Generated by envrig.";
const BLOCK_BEGIN: &str = "# >>> envrig hook: ";
const BLOCK_END: &str = "# <<< envrig hook: ";

/// One check to run before each commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookEntry {
    pub name: String,
    pub command: Vec<String>,
}

/// Environment the generated script reproduces when git runs it.
#[derive(Debug, Clone, Default)]
pub struct HookScriptContext {
    /// Toolchain directories to put in front of `PATH`, highest precedence first.
    pub search_path: Vec<PathBuf>,
    /// Short descriptor id, written into the script header.
    pub label: String,
}

/// Prior contents of every file an installer may touch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookSnapshot {
    files: Vec<(PathBuf, Option<Vec<u8>>)>,
}

impl HookSnapshot {
    pub fn capture(paths: &[PathBuf]) -> io::Result<Self> {
        let files = paths
            .iter()
            .map(|p| Ok((p.clone(), read_optional(p)?)))
            .collect::<io::Result<_>>()?;
        Ok(Self { files })
    }

    /// Put every captured file back, removing files that did not exist.
    pub fn restore(&self) -> io::Result<()> {
        for (path, content) in &self.files {
            put_back(path, content.as_deref())?;
        }
        Ok(())
    }

    /// Like `restore`, but only for files whose content is still what
    /// `after` captured. Files rewritten since then are left alone.
    pub fn restore_if_unchanged(&self, after: &HookSnapshot) -> io::Result<()> {
        for (path, content) in &self.files {
            let current = read_optional(path)?;
            if current == *content {
                continue;
            }
            match after.content_of(path) {
                Some(written) if *written == current => put_back(path, content.as_deref())?,
                _ => warn!(
                    "{} changed since it was installed, leaving it in place",
                    path.display()
                ),
            }
        }
        Ok(())
    }

    fn content_of(&self, path: &Path) -> Option<&Option<Vec<u8>>> {
        self.files
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, content)| content)
    }
}

fn put_back(path: &Path, content: Option<&[u8]>) -> io::Result<()> {
    match content {
        Some(bytes) => write_executable(path, bytes),
        None => match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub hook_path: PathBuf,
    pub hooks: Vec<String>,
    /// False when the file already had exactly this content.
    pub changed: bool,
    /// Where a pre-existing foreign hook lives, if there is one.
    pub legacy: Option<PathBuf>,
}

/// Installs pre-commit checks into a repository.
pub trait HookInstaller {
    fn snapshot(&self) -> Result<HookSnapshot, ActivationError>;

    /// Converge the installed hook set to exactly `entries`, in order.
    /// An empty set removes the managed hook.
    fn install(
        &self,
        entries: &[HookEntry],
        ctx: &HookScriptContext,
    ) -> Result<InstallReport, ActivationError>;

    /// Undo an install that turned `before` into `after`.
    fn restore(
        &self,
        before: &HookSnapshot,
        after: &HookSnapshot,
    ) -> Result<(), ActivationError> {
        before
            .restore_if_unchanged(after)
            .map_err(ActivationError::from)
    }

    /// Remove the managed hook. Returns whether anything was removed.
    fn uninstall(&self) -> Result<bool, ActivationError>;

    /// Names of the hooks currently installed, in run order.
    fn installed(&self) -> Result<Vec<String>, ActivationError>;
}

/// Owns `<hooks dir>/pre-commit` of a git repository.
///
/// The file is a generated shell script with one delimited block per hook.
/// A `pre-commit` file not generated by envrig is kept as
/// `pre-commit.legacy` and chained before the managed blocks.
#[derive(Debug, Clone)]
pub struct GitHookInstaller {
    hooks_dir: PathBuf,
}

impl GitHookInstaller {
    /// Find the repository containing `project_root` and its hooks directory,
    /// honouring `core.hooksPath`.
    pub fn discover(project_root: &Path) -> Result<Self, ActivationError> {
        let repo = git2::Repository::discover(project_root).map_err(|e| {
            ActivationError::HookInstall(format!(
                "{} is not inside a git repository: {}",
                project_root.display(),
                e.message()
            ))
        })?;

        let configured = repo
            .config()
            .and_then(|config| config.get_path("core.hooksPath"));
        let hooks_dir = match configured {
            Ok(path) if path.is_absolute() => path,
            Ok(path) => repo.workdir().unwrap_or_else(|| repo.path()).join(path),
            Err(_) => repo.path().join("hooks"),
        };
        debug!("git hooks directory: {}", hooks_dir.display());
        Ok(Self { hooks_dir })
    }

    pub fn with_hooks_dir(hooks_dir: impl Into<PathBuf>) -> Self {
        Self {
            hooks_dir: hooks_dir.into(),
        }
    }

    pub fn hooks_dir(&self) -> &Path {
        &self.hooks_dir
    }

    pub fn hook_path(&self) -> PathBuf {
        self.hooks_dir.join(HOOK_NAME)
    }

    pub fn legacy_path(&self) -> PathBuf {
        self.hooks_dir.join(LEGACY_HOOK_NAME)
    }

    /// Keep a foreign `pre-commit` as `pre-commit.legacy`. Returns whether
    /// this call created the legacy file.
    ///
    /// The hook is linked rather than renamed, so `pre-commit` exists until
    /// the managed script atomically replaces it. A legacy file that already
    /// holds the same bytes counts as preserved.
    fn preserve_foreign(&self, foreign: &[u8]) -> Result<bool, ActivationError> {
        let hook_path = self.hook_path();
        let legacy_path = self.legacy_path();
        match fs::hard_link(&hook_path, &legacy_path) {
            Ok(()) => {
                info!(
                    "preserved existing pre-commit hook as {}",
                    legacy_path.display()
                );
                Ok(true)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::AlreadyExists | io::ErrorKind::NotFound
                ) =>
            {
                if read_optional(&legacy_path)?.as_deref() == Some(foreign) {
                    debug!("{} already preserved", legacy_path.display());
                    Ok(false)
                } else if e.kind() == io::ErrorKind::AlreadyExists {
                    Err(ActivationError::HookInstall(format!(
                        "{} was not generated by envrig and {} already exists; merge them by hand",
                        hook_path.display(),
                        legacy_path.display()
                    )))
                } else {
                    Err(e.into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl HookInstaller for GitHookInstaller {
    fn snapshot(&self) -> Result<HookSnapshot, ActivationError> {
        Ok(HookSnapshot::capture(&[
            self.hook_path(),
            self.legacy_path(),
        ])?)
    }

    fn install(
        &self,
        entries: &[HookEntry],
        ctx: &HookScriptContext,
    ) -> Result<InstallReport, ActivationError> {
        let hook_path = self.hook_path();
        let legacy_path = self.legacy_path();

        if entries.is_empty() {
            let managed = read_optional(&hook_path)?.is_some_and(|c| is_managed(&c));
            let changed = managed && self.uninstall()?;
            return Ok(InstallReport {
                hook_path,
                hooks: Vec::new(),
                changed,
                legacy: legacy_path.exists().then_some(legacy_path),
            });
        }

        fs::create_dir_all(&self.hooks_dir)?;
        let existing = read_optional(&hook_path)?;
        let preserved = match existing.as_deref() {
            Some(content) if !is_managed(content) => self.preserve_foreign(content)?,
            _ => false,
        };

        let entries = upsert_by_name(entries);
        let script = render_script(&entries, ctx);
        let changed = existing.as_deref() != Some(script.as_bytes());
        if changed {
            if let Err(e) = write_executable(&hook_path, script.as_bytes()) {
                if preserved {
                    if let Err(cleanup) = fs::remove_file(&legacy_path) {
                        warn!("failed to remove {}: {cleanup}", legacy_path.display());
                    }
                }
                return Err(e.into());
            }
            info!(
                "installed {} pre-commit hook(s) into {}",
                entries.len(),
                hook_path.display()
            );
        } else {
            debug!("{} already up to date", hook_path.display());
        }

        Ok(InstallReport {
            hook_path,
            hooks: entries.iter().map(|e| e.name.clone()).collect(),
            changed,
            legacy: legacy_path.exists().then_some(legacy_path),
        })
    }

    fn uninstall(&self) -> Result<bool, ActivationError> {
        let hook_path = self.hook_path();
        let legacy_path = self.legacy_path();

        let removed = match read_optional(&hook_path)? {
            Some(content) if is_managed(&content) => true,
            Some(_) => {
                warn!(
                    "{} was not generated by envrig, leaving it in place",
                    hook_path.display()
                );
                return Ok(false);
            }
            None => false,
        };

        // The legacy hook replaces the managed one in a single rename.
        match fs::rename(&legacy_path, &hook_path) {
            Ok(()) => {
                info!("restored previous pre-commit hook");
                return Ok(removed);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        if removed {
            put_back(&hook_path, None)?;
        }
        Ok(removed)
    }

    fn installed(&self) -> Result<Vec<String>, ActivationError> {
        match read_optional(&self.hook_path())? {
            Some(content) if is_managed(&content) => {
                Ok(block_names(&String::from_utf8_lossy(&content)))
            }
            _ => Ok(Vec::new()),
        }
    }
}

/// Later entries replace earlier ones of the same name, keeping the first position.
fn upsert_by_name(entries: &[HookEntry]) -> Vec<HookEntry> {
    let mut merged: Vec<HookEntry> = Vec::with_capacity(entries.len());
    for entry in entries {
        match merged.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => existing.command.clone_from(&entry.command),
            None => merged.push(entry.clone()),
        }
    }
    merged
}

fn is_managed(content: &[u8]) -> bool {
    String::from_utf8_lossy(content).contains(MARKER)
}

fn block_names(script: &str) -> Vec<String> {
    script
        .lines()
        .filter_map(|line| line.strip_prefix(BLOCK_BEGIN))
        .map(str::to_owned)
        .collect()
}

/// The script is a pure function of its inputs, so re-installing the same
/// hook set rewrites nothing.
fn render_script(entries: &[HookEntry], ctx: &HookScriptContext) -> String {
    let mut script = String::new();
    script.push_str("#!/bin/sh\n");
    script.push_str(MARKER);
    script.push_str(" Edits are overwritten on the next activation.\n");
    if !ctx.label.is_empty() {
        script.push_str(&format!("# descriptor: {}\n", ctx.label));
    }
    script.push_str("if [ \"${ENVRIG_SKIP_HOOKS:-}\" = \"1\" ]; then\n    exit 0\nfi\n");
    script.push_str("set -e\n");

    if !ctx.search_path.is_empty() {
        let dirs: Vec<String> = ctx
            .search_path
            .iter()
            .map(|d| sh_quote(&d.to_string_lossy()))
            .collect();
        script.push_str(&format!("PATH={}:\"$PATH\"\nexport PATH\n", dirs.join(":")));
    }

    script.push_str(&format!(
        "hook_dir=$(dirname \"$0\")\nif [ -x \"$hook_dir/{LEGACY_HOOK_NAME}\" ]; then\n    \"$hook_dir/{LEGACY_HOOK_NAME}\" \"$@\"\nfi\n"
    ));

    for entry in entries {
        let command: Vec<String> = entry.command.iter().map(|a| sh_quote(a)).collect();
        script.push('\n');
        script.push_str(&format!("{BLOCK_BEGIN}{}\n", entry.name));
        script.push_str(&format!("echo {} >&2\n", sh_quote(&format!("envrig: {}", entry.name))));
        script.push_str(&command.join(" "));
        script.push('\n');
        script.push_str(&format!("{BLOCK_END}{}\n", entry.name));
    }
    script
}

fn sh_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));
    if safe {
        arg.to_owned()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Atomic replace: concurrent activations never observe a torn file.
fn write_executable(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o755))?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
