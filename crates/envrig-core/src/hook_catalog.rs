use crate::provider::{Effect, Provider, ProviderRequest, ResolvedProvider};
use crate::ResolveError;
use envrig_schema::ProviderKind;
use std::path::PathBuf;

/// (name, entry command, required language)
const CATALOG: &[(&str, &[&str], Option<&str>)] = &[
    ("rustfmt", &["cargo", "fmt", "--all", "--", "--check"], Some("rust")),
    ("clippy", &["cargo", "clippy", "--all-targets"], Some("rust")),
    ("cargo-check", &["cargo", "check", "--all-targets"], Some("rust")),
    ("black", &["black", "--check", "."], Some("python")),
    ("ruff", &["ruff", "check", "."], Some("python")),
    ("gofmt", &["sh", "-c", "test -z \"$(gofmt -l .)\""], Some("go")),
    ("govet", &["go", "vet", "./..."], Some("go")),
    ("prettier", &["npx", "--no-install", "prettier", "--check", "."], Some("nodejs")),
    ("eslint", &["npx", "--no-install", "eslint", "."], Some("nodejs")),
    (
        "shellcheck",
        &["sh", "-c", "git ls-files -z '*.sh' | xargs -0 -r shellcheck"],
        None,
    ),
];

/// A pre-commit check: an entry command plus descriptor-supplied arguments.
#[derive(Debug, Clone)]
pub struct HookProvider {
    name: String,
    entry: Vec<String>,
    requires: Option<String>,
}

impl HookProvider {
    pub fn new(name: impl Into<String>, entry: Vec<String>) -> Self {
        Self {
            name: name.into(),
            entry,
            requires: None,
        }
    }

    #[must_use]
    pub fn requiring(mut self, language: &str) -> Self {
        self.requires = Some(language.to_owned());
        self
    }

    pub fn builtin_all() -> Vec<Self> {
        CATALOG
            .iter()
            .map(|(name, entry, requires)| {
                let hook = Self::new(*name, entry.iter().map(|s| (*s).to_owned()).collect());
                match requires {
                    Some(lang) => hook.requiring(lang),
                    None => hook,
                }
            })
            .collect()
    }

    pub fn entry(&self) -> &[String] {
        &self.entry
    }
}

impl Provider for HookProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Hook
    }

    fn resolve(&self, request: &ProviderRequest<'_>) -> Result<ResolvedProvider, ResolveError> {
        let mut command = self.entry.clone();
        command.extend(request.args.iter().cloned());

        // The program is looked up on the search path when the hook runs.
        let executable_refs = self.entry.first().map(PathBuf::from).into_iter().collect();

        Ok(ResolvedProvider {
            kind: ProviderKind::Hook,
            name: self.name.clone(),
            version: None,
            capabilities: vec!["pre-commit".to_owned()],
            executable_refs,
            activation_effects: vec![Effect::InstallHook {
                name: self.name.clone(),
                command,
            }],
        })
    }

    fn fingerprint_into(&self, hasher: &mut blake3::Hasher) {
        hasher.update(format!("hook:{}", self.name).as_bytes());
        for part in &self.entry {
            hasher.update(format!("entry:{part}").as_bytes());
        }
        if let Some(lang) = &self.requires {
            hasher.update(format!("requires:{lang}").as_bytes());
        }
    }

    fn requires(&self) -> Option<&str> {
        self.requires.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clippy() -> HookProvider {
        HookProvider::builtin_all()
            .into_iter()
            .find(|h| h.name() == "clippy")
            .unwrap()
    }

    #[test]
    fn args_are_appended_to_entry() {
        let args = vec!["--".to_owned(), "-D".to_owned(), "warnings".to_owned()];
        let resolved = clippy()
            .resolve(&ProviderRequest {
                name: "clippy",
                version: None,
                args: &args,
                key_path: "hooks.clippy",
            })
            .unwrap();
        assert_eq!(
            resolved.activation_effects,
            vec![Effect::InstallHook {
                name: "clippy".to_owned(),
                command: vec![
                    "cargo".to_owned(),
                    "clippy".to_owned(),
                    "--all-targets".to_owned(),
                    "--".to_owned(),
                    "-D".to_owned(),
                    "warnings".to_owned(),
                ],
            }]
        );
        assert_eq!(resolved.executable_refs, vec![PathBuf::from("cargo")]);
    }

    #[test]
    fn builtin_requirements() {
        assert_eq!(clippy().requires(), Some("rust"));
        let shellcheck = HookProvider::builtin_all()
            .into_iter()
            .find(|h| h.name() == "shellcheck")
            .unwrap();
        assert_eq!(shellcheck.requires(), None);
    }

    #[test]
    fn builtin_names_are_unique() {
        let mut names: Vec<String> = HookProvider::builtin_all()
            .iter()
            .map(|h| h.name().to_owned())
            .collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(before, names.len());
        assert_eq!(before, 10);
    }
}
