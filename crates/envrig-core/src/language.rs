use crate::provider::{Effect, Provider, ProviderRequest, ResolvedProvider};
use crate::ResolveError;
use envrig_schema::ProviderKind;
use semver::{Version, VersionReq};
use std::path::{Path, PathBuf};

struct CatalogEntry {
    name: &'static str,
    versions: &'static [&'static str],
    executables: &'static [&'static str],
    capabilities: &'static [&'static str],
    /// Values may reference `{prefix}` and `{version}`.
    variables: &'static [(&'static str, &'static str)],
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        name: "rust",
        versions: &["1.76.0", "1.77.2", "1.78.0", "1.79.0", "1.80.1", "1.81.0-beta.3"],
        executables: &["cargo", "rustc", "rustdoc", "rustfmt", "cargo-clippy", "clippy-driver"],
        capabilities: &["compiler", "package-manager", "formatter", "linter"],
        variables: &[("RUST_SRC_PATH", "{prefix}/lib/rustlib/src/rust/library")],
    },
    CatalogEntry {
        name: "python",
        versions: &["3.10.14", "3.11.9", "3.12.4", "3.13.0-rc.1"],
        executables: &["python3", "pip3"],
        capabilities: &["interpreter", "package-manager"],
        variables: &[],
    },
    CatalogEntry {
        name: "go",
        versions: &["1.21.13", "1.22.6", "1.23.0"],
        executables: &["go", "gofmt"],
        capabilities: &["compiler", "formatter"],
        variables: &[("GOROOT", "{prefix}")],
    },
    CatalogEntry {
        name: "nodejs",
        versions: &["18.20.4", "20.16.0", "22.6.0"],
        executables: &["node", "npm", "npx"],
        capabilities: &["runtime", "package-manager"],
        variables: &[],
    },
];

/// A language toolchain laid out as `<root>/<name>/<version>/bin/<exe>`.
#[derive(Debug, Clone)]
pub struct LanguageProvider {
    name: String,
    /// Sorted ascending.
    versions: Vec<Version>,
    executables: Vec<String>,
    capabilities: Vec<String>,
    variables: Vec<(String, String)>,
    toolchains_root: PathBuf,
}

impl LanguageProvider {
    pub fn new(
        name: impl Into<String>,
        mut versions: Vec<Version>,
        executables: Vec<String>,
        toolchains_root: impl Into<PathBuf>,
    ) -> Self {
        versions.sort();
        versions.dedup();
        Self {
            name: name.into(),
            versions,
            executables,
            capabilities: Vec::new(),
            variables: Vec::new(),
            toolchains_root: toolchains_root.into(),
        }
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: &[&str]) -> Self {
        self.capabilities = capabilities.iter().map(|c| (*c).to_owned()).collect();
        self
    }

    #[must_use]
    pub fn with_variable(mut self, key: &str, value_template: &str) -> Self {
        self.variables
            .push((key.to_owned(), value_template.to_owned()));
        self
    }

    /// The built-in toolchain catalogue rooted at `toolchains_root`.
    pub fn builtin_all(toolchains_root: &Path) -> Vec<Self> {
        CATALOG
            .iter()
            .map(|entry| {
                let versions = entry
                    .versions
                    .iter()
                    .filter_map(|v| Version::parse(v).ok())
                    .collect();
                let executables = entry.executables.iter().map(|e| (*e).to_owned()).collect();
                let mut provider = Self::new(entry.name, versions, executables, toolchains_root)
                    .with_capabilities(entry.capabilities);
                for (key, template) in entry.variables {
                    provider = provider.with_variable(key, template);
                }
                provider
            })
            .collect()
    }

    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Pick a version for a descriptor request.
    ///
    /// Absent, `latest` and `stable` select the highest version without a
    /// pre-release tag. A full version must match exactly; a partial one
    /// (`1.80`, `3`) selects the highest stable version sharing that prefix.
    /// Anything else is read as a semver requirement.
    pub fn select_version(&self, requested: Option<&str>) -> Option<&Version> {
        let raw = match requested.map(str::trim) {
            None | Some("" | "latest" | "stable") => {
                return self.versions.iter().rev().find(|v| v.pre.is_empty());
            }
            Some(raw) => raw.strip_prefix('v').unwrap_or(raw),
        };

        if let Ok(exact) = Version::parse(raw) {
            return self.versions.iter().find(|v| **v == exact);
        }

        let req = if raw.starts_with(|c: char| c.is_ascii_digit()) {
            VersionReq::parse(&format!("~{raw}"))
        } else {
            VersionReq::parse(raw)
        }
        .ok()?;

        self.versions
            .iter()
            .rev()
            .find(|v| v.pre.is_empty() && req.matches(v))
    }

    fn prefix(&self, version: &Version) -> PathBuf {
        self.toolchains_root
            .join(&self.name)
            .join(version.to_string())
    }
}

impl Provider for LanguageProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Toolchain
    }

    fn resolve(&self, request: &ProviderRequest<'_>) -> Result<ResolvedProvider, ResolveError> {
        let version = self
            .select_version(request.version)
            .ok_or_else(|| ResolveError::UnknownVersion {
                name: self.name.clone(),
                requested: request.version.unwrap_or("latest").to_owned(),
                key_path: request.key_path.to_owned(),
                available: self
                    .versions
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            })?;

        let prefix = self.prefix(version);
        let bin = prefix.join("bin");
        let executable_refs = self.executables.iter().map(|e| bin.join(e)).collect();

        let prefix_str = prefix.to_string_lossy();
        let version_str = version.to_string();
        let mut activation_effects = vec![Effect::PrependPath { dir: bin.clone() }];
        for (key, template) in &self.variables {
            activation_effects.push(Effect::SetVar {
                key: key.clone(),
                value: template
                    .replace("{prefix}", &prefix_str)
                    .replace("{version}", &version_str),
            });
        }

        Ok(ResolvedProvider {
            kind: ProviderKind::Toolchain,
            name: self.name.clone(),
            version: Some(version_str),
            capabilities: self.capabilities.clone(),
            executable_refs,
            activation_effects,
        })
    }

    fn fingerprint_into(&self, hasher: &mut blake3::Hasher) {
        // The toolchains root is machine-local and stays out of the fingerprint.
        hasher.update(format!("toolchain:{}", self.name).as_bytes());
        for version in &self.versions {
            hasher.update(format!("version:{version}").as_bytes());
        }
        for exe in &self.executables {
            hasher.update(format!("exe:{exe}").as_bytes());
        }
        for (key, template) in &self.variables {
            hasher.update(format!("var:{key}={template}").as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rust() -> LanguageProvider {
        LanguageProvider::builtin_all(Path::new("/opt/tc"))
            .into_iter()
            .find(|p| p.name() == "rust")
            .unwrap()
    }

    fn select(provider: &LanguageProvider, requested: Option<&str>) -> Option<String> {
        provider.select_version(requested).map(ToString::to_string)
    }

    #[test]
    fn latest_skips_prereleases() {
        let rust = rust();
        assert_eq!(select(&rust, None).as_deref(), Some("1.80.1"));
        assert_eq!(select(&rust, Some("latest")).as_deref(), Some("1.80.1"));
        assert_eq!(select(&rust, Some("stable")).as_deref(), Some("1.80.1"));
    }

    #[test]
    fn exact_version_matches_exactly() {
        let rust = rust();
        assert_eq!(select(&rust, Some("1.77.2")).as_deref(), Some("1.77.2"));
        assert_eq!(select(&rust, Some("v1.78.0")).as_deref(), Some("1.78.0"));
        assert_eq!(select(&rust, Some("1.77.0")), None);
        assert_eq!(
            select(&rust, Some("1.81.0-beta.3")).as_deref(),
            Some("1.81.0-beta.3")
        );
    }

    #[test]
    fn partial_version_selects_highest_in_series() {
        let rust = rust();
        assert_eq!(select(&rust, Some("1.80")).as_deref(), Some("1.80.1"));
        assert_eq!(select(&rust, Some("1")).as_deref(), Some("1.80.1"));
        assert_eq!(select(&rust, Some("2")), None);
    }

    #[test]
    fn operator_requirement() {
        let rust = rust();
        assert_eq!(
            select(&rust, Some(">=1.77, <1.80")).as_deref(),
            Some("1.79.0")
        );
        assert_eq!(select(&rust, Some("not a version")), None);
    }

    #[test]
    fn resolve_lays_out_executables_under_root() {
        let resolved = rust()
            .resolve(&ProviderRequest {
                name: "rust",
                version: Some("1.79"),
                args: &[],
                key_path: "languages.rust",
            })
            .unwrap();
        assert_eq!(resolved.version.as_deref(), Some("1.79.0"));
        assert_eq!(
            resolved.executable_refs[0],
            PathBuf::from("/opt/tc/rust/1.79.0/bin/cargo")
        );
        assert_eq!(
            resolved.activation_effects[0],
            Effect::PrependPath {
                dir: PathBuf::from("/opt/tc/rust/1.79.0/bin")
            }
        );
        assert_eq!(
            resolved.activation_effects[1],
            Effect::SetVar {
                key: "RUST_SRC_PATH".to_owned(),
                value: "/opt/tc/rust/1.79.0/lib/rustlib/src/rust/library".to_owned(),
            }
        );
    }

    #[test]
    fn unknown_version_lists_available() {
        let err = rust()
            .resolve(&ProviderRequest {
                name: "rust",
                version: Some("0.9"),
                args: &[],
                key_path: "languages.rust",
            })
            .unwrap_err();
        assert_eq!(err.key_path(), "languages.rust");
        assert!(err.to_string().contains("1.80.1"));
    }

    #[test]
    fn fingerprint_ignores_toolchains_root() {
        let a = LanguageProvider::new("zig", vec![Version::new(0, 13, 0)], vec![], "/a");
        let b = LanguageProvider::new("zig", vec![Version::new(0, 13, 0)], vec![], "/b");
        let mut ha = blake3::Hasher::new();
        let mut hb = blake3::Hasher::new();
        a.fingerprint_into(&mut ha);
        b.fingerprint_into(&mut hb);
        assert_eq!(ha.finalize(), hb.finalize());
    }
}
