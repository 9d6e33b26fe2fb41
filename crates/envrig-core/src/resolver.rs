use crate::provider::{ProviderRequest, ResolvedProvider};
use crate::registry::ProviderRegistry;
use crate::ResolveError;
use envrig_schema::{NormalizedDescriptor, ProviderKind, ResolutionResult};
use tracing::{debug, warn};

/// Map every enabled descriptor entry to a concrete provider.
///
/// Toolchains come first, then hooks, each in declaration order. Nothing is
/// read from disk, so the same descriptor against the same registry always
/// produces the same sequence.
pub fn resolve(
    descriptor: &NormalizedDescriptor,
    registry: &ProviderRegistry,
) -> Result<Vec<ResolvedProvider>, ResolveError> {
    let mut resolved = Vec::with_capacity(descriptor.languages.len() + descriptor.hooks.len());

    for lang in &descriptor.languages {
        let provider = registry
            .lookup(ProviderKind::Toolchain, &lang.name)
            .ok_or_else(|| ResolveError::UnknownLanguage {
                name: lang.name.clone(),
                key_path: lang.key_path.clone(),
                known: registry.names(ProviderKind::Toolchain).join(", "),
            })?;
        let result = provider.resolve(&ProviderRequest {
            name: &lang.name,
            version: lang.version.as_deref(),
            args: &[],
            key_path: &lang.key_path,
        })?;
        debug!(
            "resolved toolchain {}@{}",
            result.name,
            result.version.as_deref().unwrap_or("-")
        );
        resolved.push(result);
    }

    for hook in &descriptor.hooks {
        let provider = registry
            .lookup(ProviderKind::Hook, &hook.name)
            .ok_or_else(|| ResolveError::UnknownHook {
                name: hook.name.clone(),
                key_path: hook.key_path.clone(),
                known: registry.names(ProviderKind::Hook).join(", "),
            })?;
        if let Some(lang) = provider.requires() {
            if !descriptor.languages.iter().any(|l| l.name == lang) {
                warn!(
                    "hook '{}' expects language '{lang}', which is not enabled; it will run with whatever is on PATH",
                    hook.name
                );
            }
        }
        let result = provider.resolve(&ProviderRequest {
            name: &hook.name,
            version: None,
            args: &hook.args,
            key_path: &hook.key_path,
        })?;
        debug!("resolved hook {}", result.name);
        resolved.push(result);
    }

    Ok(resolved)
}

/// Lock-file shape of a resolution.
pub fn resolution_result(
    registry: &ProviderRegistry,
    providers: &[ResolvedProvider],
) -> ResolutionResult {
    ResolutionResult {
        registry_fingerprint: registry.fingerprint(),
        providers: providers.iter().map(ResolvedProvider::to_locked).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envrig_schema::load;
    use std::path::Path;

    fn normalized(input: &str) -> NormalizedDescriptor {
        load(input).unwrap().normalize().unwrap()
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::builtin(Path::new("/opt/tc"))
    }

    const RUST_PROJECT: &str = r#"
[hooks.clippy]
enable = true
args = ["--", "-D", "warnings"]

[languages.rust]
enable = true

[hooks.rustfmt]
enable = true

[dotenv]
enable = true
"#;

    #[test]
    fn toolchains_before_hooks_in_declaration_order() {
        let providers = resolve(&normalized(RUST_PROJECT), &registry()).unwrap();
        let order: Vec<(ProviderKind, &str)> = providers
            .iter()
            .map(|p| (p.kind, p.name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (ProviderKind::Toolchain, "rust"),
                (ProviderKind::Hook, "clippy"),
                (ProviderKind::Hook, "rustfmt"),
            ]
        );
    }

    #[test]
    fn resolution_is_deterministic() {
        let descriptor = normalized(RUST_PROJECT);
        let registry = registry();
        let first = resolve(&descriptor, &registry).unwrap();
        for _ in 0..10 {
            assert_eq!(resolve(&descriptor, &registry).unwrap(), first);
        }
        assert_eq!(
            resolution_result(&registry, &first).providers,
            resolution_result(&registry, &resolve(&descriptor, &registry).unwrap()).providers
        );
    }

    #[test]
    fn disabled_language_yields_no_toolchain() {
        let providers = resolve(
            &normalized("[languages.rust]\nenable = false\n[hooks.rustfmt]\nenable = true\n"),
            &registry(),
        )
        .unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].kind, ProviderKind::Hook);
    }

    #[test]
    fn unknown_language_reports_key_path() {
        let err = resolve(
            &normalized("[languages.cobol]\nenable = true\n"),
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownLanguage { ref name, .. } if name == "cobol"));
        assert_eq!(err.key_path(), "languages.cobol");
    }

    #[test]
    fn unknown_hook_reports_key_path() {
        let err = resolve(
            &normalized("[hooks.Pylint]\nenable = true\n"),
            &registry(),
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownHook { ref name, .. } if name == "pylint"));
        assert_eq!(err.key_path(), "hooks.Pylint");
    }

    #[test]
    fn hook_without_its_language_still_resolves() {
        let providers = resolve(&normalized("[hooks.black]\nenable = true\n"), &registry()).unwrap();
        assert_eq!(providers[0].name, "black");
    }

    #[test]
    fn empty_descriptor_resolves_to_nothing() {
        assert!(resolve(&normalized(""), &registry()).unwrap().is_empty());
    }
}
