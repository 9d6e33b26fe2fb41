use crate::provider::ResolvedProvider;
use crate::ActivationError;
use tracing::debug;

/// Makes a resolved toolchain's executables available on disk.
pub trait ToolchainInstaller {
    fn name(&self) -> &str;

    fn ensure(&self, provider: &ResolvedProvider) -> Result<(), ActivationError>;
}

/// Expects toolchains to be unpacked under the toolchains root already and
/// only checks that every referenced executable is present.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefixInstaller;

impl ToolchainInstaller for PrefixInstaller {
    fn name(&self) -> &str {
        "prefix"
    }

    fn ensure(&self, provider: &ResolvedProvider) -> Result<(), ActivationError> {
        let version = provider.version.as_deref().unwrap_or("-");
        for exe in &provider.executable_refs {
            if !exe.is_file() {
                return Err(ActivationError::ProviderInstall {
                    name: format!("{}@{version}", provider.name),
                    reason: format!(
                        "missing executable {} (install the toolchain under this prefix or set ENVRIG_TOOLCHAINS)",
                        exe.display()
                    ),
                });
            }
        }
        debug!(
            "toolchain {}@{version}: {} executables present",
            provider.name,
            provider.executable_refs.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envrig_schema::ProviderKind;
    use std::fs;

    fn provider(refs: Vec<std::path::PathBuf>) -> ResolvedProvider {
        ResolvedProvider {
            kind: ProviderKind::Toolchain,
            name: "go".to_owned(),
            version: Some("1.23.0".to_owned()),
            capabilities: Vec::new(),
            executable_refs: refs,
            activation_effects: Vec::new(),
        }
    }

    #[test]
    fn present_executables_pass() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("go");
        fs::write(&exe, "").unwrap();
        assert!(PrefixInstaller.ensure(&provider(vec![exe])).is_ok());
    }

    #[test]
    fn missing_executable_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("gofmt");
        let err = PrefixInstaller.ensure(&provider(vec![exe])).unwrap_err();
        match err {
            ActivationError::ProviderInstall { name, reason } => {
                assert_eq!(name, "go@1.23.0");
                assert!(reason.contains("gofmt"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
