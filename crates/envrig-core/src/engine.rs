use crate::activator::{hook_entries, precedence_dirs, ActivationResult, Activator};
use crate::config::EngineConfig;
use crate::context::ShellContext;
use crate::hooks::{GitHookInstaller, HookInstaller, HookScriptContext, InstallReport};
use crate::provider::ResolvedProvider;
use crate::registry::ProviderRegistry;
use crate::resolver::{resolution_result, resolve};
use crate::toolchain::{PrefixInstaller, ToolchainInstaller};
use crate::CoreError;
use envrig_schema::{
    compute_descriptor_id, load_file, DescriptorIdentity, DotenvPolicy, EnvironmentDescriptor,
    LockError, LockFile, NormalizedDescriptor, ProviderKind,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Entry point for loading, resolving, locking and activating projects.
///
/// Every operation takes the project root explicitly; the engine itself
/// only holds configuration and the provider registry.
pub struct Engine {
    config: EngineConfig,
    registry: ProviderRegistry,
}

/// A descriptor read from disk, validated and normalized.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub root: PathBuf,
    pub descriptor: EnvironmentDescriptor,
    pub normalized: NormalizedDescriptor,
    pub identity: DescriptorIdentity,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub project: LoadedProject,
    pub providers: Vec<ResolvedProvider>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ActivateOptions {
    /// Require an up-to-date lock file.
    pub locked: bool,
    pub skip_hooks: bool,
    pub skip_dotenv: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    pub descriptor_id: String,
    pub short_id: String,
    pub providers: Vec<ResolvedProvider>,
    #[serde(flatten)]
    pub result: ActivationResult,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum LockStatus {
    Missing,
    Current,
    Stale(String),
    Invalid(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatus {
    pub descriptor_path: PathBuf,
    pub short_id: String,
    pub languages: Vec<String>,
    pub hooks_declared: Vec<String>,
    pub hooks_installed: Vec<String>,
    pub git_repository: bool,
    pub dotenv: DotenvPolicy,
    pub lock: LockStatus,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let registry = ProviderRegistry::builtin(&config.toolchains_root);
        Self { config, registry }
    }

    pub fn with_registry(config: EngineConfig, registry: ProviderRegistry) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn descriptor_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.config.descriptor_file)
    }

    pub fn lock_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.config.lock_file)
    }

    pub fn load(&self, project_root: &Path) -> Result<LoadedProject, CoreError> {
        let path = self.descriptor_path(project_root);
        debug!("loading descriptor {}", path.display());
        let descriptor = load_file(&path)?;
        let normalized = descriptor.normalize()?;
        let identity = compute_descriptor_id(&normalized)?;
        Ok(LoadedProject {
            root: project_root.to_path_buf(),
            descriptor,
            normalized,
            identity,
        })
    }

    /// Load and resolve. Performs no side effects.
    pub fn resolve(&self, project_root: &Path) -> Result<Resolution, CoreError> {
        let project = self.load(project_root)?;
        let providers = resolve(&project.normalized, &self.registry)?;
        info!(
            "resolved {} provider(s) for descriptor {}",
            providers.len(),
            project.identity.short_id
        );
        Ok(Resolution { project, providers })
    }

    /// Resolve and write the lock file.
    pub fn lock(&self, project_root: &Path) -> Result<LockFile, CoreError> {
        let resolution = self.resolve(project_root)?;
        let lock = self.lock_for(&resolution)?;
        let path = self.lock_path(project_root);
        lock.write_to_file(&path)?;
        info!("wrote {} ({})", path.display(), lock.short_id);
        Ok(lock)
    }

    /// Check that the lock file is intact and matches a fresh resolution.
    pub fn check_lock(&self, project_root: &Path) -> Result<LockFile, CoreError> {
        let resolution = self.resolve(project_root)?;
        self.verify_lock(&resolution)
    }

    pub fn activate(
        &self,
        project_root: &Path,
        options: ActivateOptions,
        ctx: &mut dyn ShellContext,
    ) -> Result<ActivationReport, CoreError> {
        let resolution = self.prepare(project_root, options)?;
        let wants_hooks = resolution
            .providers
            .iter()
            .any(|p| p.kind == ProviderKind::Hook);
        // Discovery happens before anything is touched. Without declared hooks
        // the installer is still needed to remove a previously managed one.
        let git_hooks = if options.skip_hooks {
            None
        } else {
            match GitHookInstaller::discover(project_root) {
                Ok(installer) => Some(installer),
                Err(e) if wants_hooks => return Err(e.into()),
                Err(_) => {
                    debug!("{} is not in a git repository", project_root.display());
                    None
                }
            }
        };
        self.apply(
            resolution,
            options,
            ctx,
            &PrefixInstaller,
            git_hooks.as_ref().map(|h| h as &dyn HookInstaller),
        )
    }

    /// `activate` with caller-supplied installers.
    pub fn activate_with(
        &self,
        project_root: &Path,
        options: ActivateOptions,
        ctx: &mut dyn ShellContext,
        toolchains: &dyn ToolchainInstaller,
        hooks: Option<&dyn HookInstaller>,
    ) -> Result<ActivationReport, CoreError> {
        let resolution = self.prepare(project_root, options)?;
        self.apply(resolution, options, ctx, toolchains, hooks)
    }

    /// Install only the declared pre-commit hooks.
    pub fn install_hooks(&self, project_root: &Path) -> Result<InstallReport, CoreError> {
        let resolution = self.resolve(project_root)?;
        let installer = GitHookInstaller::discover(project_root)?;
        let report = installer.install(
            &hook_entries(&resolution.providers),
            &HookScriptContext {
                search_path: precedence_dirs(&resolution.providers),
                label: resolution.project.identity.short_id.to_string(),
            },
        )?;
        Ok(report)
    }

    pub fn uninstall_hooks(&self, project_root: &Path) -> Result<bool, CoreError> {
        let installer = GitHookInstaller::discover(project_root)?;
        Ok(installer.uninstall()?)
    }

    pub fn status(&self, project_root: &Path) -> Result<ProjectStatus, CoreError> {
        let project = self.load(project_root)?;
        let (git_repository, hooks_installed) = match GitHookInstaller::discover(project_root) {
            Ok(installer) => (true, installer.installed()?),
            Err(_) => (false, Vec::new()),
        };

        let lock_path = self.lock_path(project_root);
        let lock = if lock_path.exists() {
            match LockFile::read_from_file(&lock_path) {
                Ok(lock) => match lock.verify_integrity() {
                    Err(e) => LockStatus::Invalid(e.to_string()),
                    Ok(_) => match lock.verify_descriptor_intent(&project.normalized) {
                        Ok(()) => LockStatus::Current,
                        Err(e) => LockStatus::Stale(e.to_string()),
                    },
                },
                Err(e) => LockStatus::Invalid(e.to_string()),
            }
        } else {
            LockStatus::Missing
        };

        Ok(ProjectStatus {
            descriptor_path: self.descriptor_path(project_root),
            short_id: project.identity.short_id.to_string(),
            languages: project
                .normalized
                .languages
                .iter()
                .map(|l| l.name.clone())
                .collect(),
            hooks_declared: project
                .normalized
                .hooks
                .iter()
                .map(|h| h.name.clone())
                .collect(),
            hooks_installed,
            git_repository,
            dotenv: project.normalized.dotenv.clone(),
            lock,
        })
    }

    fn prepare(
        &self,
        project_root: &Path,
        options: ActivateOptions,
    ) -> Result<Resolution, CoreError> {
        let resolution = self.resolve(project_root)?;
        if options.locked {
            self.verify_lock(&resolution)?;
        }
        Ok(resolution)
    }

    fn apply(
        &self,
        resolution: Resolution,
        options: ActivateOptions,
        ctx: &mut dyn ShellContext,
        toolchains: &dyn ToolchainInstaller,
        hooks: Option<&dyn HookInstaller>,
    ) -> Result<ActivationReport, CoreError> {
        let Resolution { project, providers } = resolution;
        let providers: Vec<ResolvedProvider> = providers
            .into_iter()
            .filter(|p| !(options.skip_hooks && p.kind == ProviderKind::Hook))
            .collect();
        let dotenv = if options.skip_dotenv {
            DotenvPolicy::disabled()
        } else {
            project.normalized.dotenv.clone()
        };

        let mut activator = Activator::new(&project.root, toolchains)
            .with_label(project.identity.short_id.as_str());
        if let Some(installer) = hooks {
            activator = activator.with_hook_installer(installer);
        }
        debug!("using {} toolchain installer", toolchains.name());
        let result = activator.activate(&providers, &dotenv, ctx)?;

        Ok(ActivationReport {
            descriptor_id: project.identity.descriptor_id.to_string(),
            short_id: project.identity.short_id.to_string(),
            providers,
            result,
        })
    }

    fn lock_for(&self, resolution: &Resolution) -> Result<LockFile, CoreError> {
        let result = resolution_result(&self.registry, &resolution.providers);
        Ok(LockFile::from_resolved(
            &resolution.project.normalized,
            &result,
        )?)
    }

    fn verify_lock(&self, resolution: &Resolution) -> Result<LockFile, CoreError> {
        let path = self.lock_path(&resolution.project.root);
        if !path.exists() {
            return Err(LockError::Drift(format!(
                "{} not found. Run 'envrig lock' first.",
                path.display()
            ))
            .into());
        }
        let lock = LockFile::read_from_file(&path)?;
        lock.verify_integrity()?;
        lock.verify_descriptor_intent(&resolution.project.normalized)?;

        let fresh = self.lock_for(resolution)?;
        if fresh.env_id != lock.env_id {
            return Err(LockError::Drift(format!(
                "resolution changed since the lock was written (lock {}, now {}). Run 'envrig lock' to re-resolve.",
                lock.short_id, fresh.short_id
            ))
            .into());
        }
        debug!("lock file {} verified", path.display());
        Ok(lock)
    }
}
