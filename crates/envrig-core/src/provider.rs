use crate::ResolveError;
use envrig_schema::{LockedProvider, ProviderKind};
use serde::Serialize;
use std::path::PathBuf;

/// One enabled descriptor entry, as handed to a provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    pub name: &'a str,
    pub version: Option<&'a str>,
    pub args: &'a [String],
    /// Dotted descriptor path of the entry, for diagnostics.
    pub key_path: &'a str,
}

/// A single change the activator applies for a resolved provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    PrependPath { dir: PathBuf },
    SetVar { key: String, value: String },
    InstallHook { name: String, command: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedProvider {
    pub kind: ProviderKind,
    pub name: String,
    pub version: Option<String>,
    pub capabilities: Vec<String>,
    pub executable_refs: Vec<PathBuf>,
    pub activation_effects: Vec<Effect>,
}

impl ResolvedProvider {
    /// Machine-independent form recorded in the lock file.
    pub fn to_locked(&self) -> LockedProvider {
        let executables = self
            .executable_refs
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        let command = self
            .activation_effects
            .iter()
            .find_map(|e| match e {
                Effect::InstallHook { command, .. } => Some(command.clone()),
                _ => None,
            })
            .unwrap_or_default();
        LockedProvider {
            kind: self.kind,
            name: self.name.clone(),
            version: self.version.clone(),
            executables,
            command,
        }
    }

    /// Directories this provider prepends to the search path.
    pub fn path_dirs(&self) -> impl Iterator<Item = &PathBuf> {
        self.activation_effects.iter().filter_map(|e| match e {
            Effect::PrependPath { dir } => Some(dir),
            _ => None,
        })
    }
}

/// A named capability the registry can resolve descriptor entries against.
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Map a descriptor entry to concrete executables and activation effects.
    ///
    /// Must be pure: the same request against the same provider always yields
    /// the same result, and nothing is read from disk.
    fn resolve(&self, request: &ProviderRequest<'_>) -> Result<ResolvedProvider, ResolveError>;

    /// Feed everything that influences `resolve` into the registry fingerprint.
    fn fingerprint_into(&self, hasher: &mut blake3::Hasher);

    /// Language this provider expects to be enabled alongside it, if any.
    fn requires(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_form_keeps_only_file_names() {
        let resolved = ResolvedProvider {
            kind: ProviderKind::Toolchain,
            name: "go".to_owned(),
            version: Some("1.22.6".to_owned()),
            capabilities: vec!["compiler".to_owned()],
            executable_refs: vec![
                PathBuf::from("/opt/tc/go/1.22.6/bin/go"),
                PathBuf::from("/opt/tc/go/1.22.6/bin/gofmt"),
            ],
            activation_effects: vec![Effect::PrependPath {
                dir: PathBuf::from("/opt/tc/go/1.22.6/bin"),
            }],
        };
        let locked = resolved.to_locked();
        assert_eq!(locked.executables, vec!["go", "gofmt"]);
        assert!(locked.command.is_empty());
        assert_eq!(resolved.path_dirs().count(), 1);
    }

    #[test]
    fn locked_form_records_hook_command() {
        let resolved = ResolvedProvider {
            kind: ProviderKind::Hook,
            name: "ruff".to_owned(),
            version: None,
            capabilities: Vec::new(),
            executable_refs: Vec::new(),
            activation_effects: vec![Effect::InstallHook {
                name: "ruff".to_owned(),
                command: vec!["ruff".to_owned(), "check".to_owned()],
            }],
        };
        assert_eq!(resolved.to_locked().command, vec!["ruff", "check"]);
        assert_eq!(resolved.path_dirs().count(), 0);
    }
}
