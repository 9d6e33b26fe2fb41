use crate::hook_catalog::HookProvider;
use crate::language::LanguageProvider;
use crate::provider::Provider;
use envrig_schema::ProviderKind;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Name-indexed set of providers, one namespace per kind.
#[derive(Default)]
pub struct ProviderRegistry {
    toolchains: BTreeMap<String, Box<dyn Provider>>,
    hooks: BTreeMap<String, Box<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in language and hook provider.
    pub fn builtin(toolchains_root: &Path) -> Self {
        let mut registry = Self::new();
        for lang in LanguageProvider::builtin_all(toolchains_root) {
            registry.register(Box::new(lang));
        }
        for hook in HookProvider::builtin_all() {
            registry.register(Box::new(hook));
        }
        registry
    }

    /// Add a provider, replacing any previous one of the same kind and name.
    pub fn register(&mut self, provider: Box<dyn Provider>) -> Option<Box<dyn Provider>> {
        let name = provider.name().to_lowercase();
        debug!("registering {} provider '{name}'", provider.kind());
        self.table_mut(provider.kind()).insert(name, provider)
    }

    pub fn lookup(&self, kind: ProviderKind, name: &str) -> Option<&dyn Provider> {
        self.table(kind).get(name).map(|p| &**p)
    }

    /// Registered names of one kind, sorted.
    pub fn names(&self, kind: ProviderKind) -> Vec<&str> {
        self.table(kind).keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.toolchains.len() + self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identity of the registry contents.
    ///
    /// Two registries with the same fingerprint resolve every descriptor to
    /// the same providers, so it is recorded in the lock file.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for provider in self.toolchains.values().chain(self.hooks.values()) {
            provider.fingerprint_into(&mut hasher);
        }
        hasher.finalize().to_hex().to_string()
    }

    fn table(&self, kind: ProviderKind) -> &BTreeMap<String, Box<dyn Provider>> {
        match kind {
            ProviderKind::Toolchain => &self.toolchains,
            ProviderKind::Hook => &self.hooks,
        }
    }

    fn table_mut(&mut self, kind: ProviderKind) -> &mut BTreeMap<String, Box<dyn Provider>> {
        match kind {
            ProviderKind::Toolchain => &mut self.toolchains,
            ProviderKind::Hook => &mut self.hooks,
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("toolchains", &self.names(ProviderKind::Toolchain))
            .field("hooks", &self.names(ProviderKind::Hook))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_contents() {
        let registry = ProviderRegistry::builtin(Path::new("/opt/tc"));
        assert_eq!(
            registry.names(ProviderKind::Toolchain),
            vec!["go", "nodejs", "python", "rust"]
        );
        assert!(registry.lookup(ProviderKind::Hook, "clippy").is_some());
        assert!(registry.lookup(ProviderKind::Toolchain, "clippy").is_none());
        assert_eq!(registry.len(), 14);
    }

    #[test]
    fn register_replaces_by_name() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        let first = registry.register(Box::new(HookProvider::new("lint", vec!["a".to_owned()])));
        assert!(first.is_none());
        let replaced =
            registry.register(Box::new(HookProvider::new("lint", vec!["b".to_owned()])));
        assert!(replaced.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let a = ProviderRegistry::builtin(Path::new("/a"));
        let b = ProviderRegistry::builtin(Path::new("/b"));
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut c = ProviderRegistry::builtin(Path::new("/a"));
        c.register(Box::new(HookProvider::new("typos", vec!["typos".to_owned()])));
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
