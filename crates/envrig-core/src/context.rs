use crate::ActivationError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::warn;

pub const PATH_VAR: &str = "PATH";

/// The shell environment activation mutates.
///
/// The activator never touches the process environment directly; callers
/// decide what the context is backed by.
pub trait ShellContext {
    fn var(&self, key: &str) -> Option<String>;

    fn set_var(&mut self, key: &str, value: &str);

    fn remove_var(&mut self, key: &str);

    fn vars(&self) -> BTreeMap<String, String>;

    fn search_path(&self) -> Vec<PathBuf> {
        self.var(PATH_VAR)
            .map(|raw| std::env::split_paths(&raw).collect())
            .unwrap_or_default()
    }

    fn set_search_path(&mut self, entries: &[PathBuf]) -> Result<(), ActivationError> {
        let joined =
            std::env::join_paths(entries).map_err(|e| ActivationError::Context(e.to_string()))?;
        self.set_var(PATH_VAR, &joined.to_string_lossy());
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryContext {
    vars: BTreeMap<String, String>,
}

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are left out with a
    /// warning. A non-UTF-8 `PATH` is an error instead, since activation
    /// rewrites it.
    pub fn from_process() -> Result<Self, ActivationError> {
        Self::from_vars_os(std::env::vars_os())
    }

    pub fn from_vars_os(
        vars: impl IntoIterator<Item = (OsString, OsString)>,
    ) -> Result<Self, ActivationError> {
        let mut ctx = Self::new();
        for (key, value) in vars {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => {
                    ctx.vars.insert(key, value);
                }
                (Ok(key), Err(_)) if key == PATH_VAR => {
                    return Err(ActivationError::Context(format!(
                        "{PATH_VAR} is not valid UTF-8"
                    )));
                }
                (key, _) => {
                    let name = key.unwrap_or_else(|raw| raw.to_string_lossy().into_owned());
                    warn!("ignoring environment variable {name}: not valid UTF-8");
                }
            }
        }
        Ok(ctx)
    }

    #[must_use]
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.set_var(key, value);
        self
    }

    pub fn into_vars(self) -> BTreeMap<String, String> {
        self.vars
    }
}

impl ShellContext for MemoryContext {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn set_var(&mut self, key: &str, value: &str) {
        self.vars.insert(key.to_owned(), value.to_owned());
    }

    fn remove_var(&mut self, key: &str) {
        self.vars.remove(key);
    }

    fn vars(&self) -> BTreeMap<String, String> {
        self.vars.clone()
    }
}

/// Whether `key` can be exported by every supported shell:
/// an ASCII letter or underscore followed by letters, digits or underscores.
pub fn is_var_name(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Variables that changed between two snapshots of a context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextDiff {
    pub set: BTreeMap<String, String>,
    pub unset: Vec<String>,
}

impl ContextDiff {
    pub fn between(before: &BTreeMap<String, String>, after: &BTreeMap<String, String>) -> Self {
        let set = after
            .iter()
            .filter(|(k, v)| before.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let unset = before
            .keys()
            .filter(|k| !after.contains_key(*k))
            .cloned()
            .collect();
        Self { set, unset }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty()
    }
}
