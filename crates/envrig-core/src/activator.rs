use crate::context::{is_var_name, ShellContext, PATH_VAR};
use crate::dotenv::{load_dotenv, DotenvOutcome};
use crate::hooks::{HookEntry, HookInstaller, HookScriptContext, InstallReport};
use crate::journal::{ActivationJournal, RollbackStep};
use crate::provider::{Effect, ResolvedProvider};
use crate::toolchain::ToolchainInstaller;
use crate::ActivationError;
use envrig_schema::{DotenvPolicy, ProviderKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivatedToolchain {
    pub name: String,
    pub version: Option<String>,
    pub bin_dirs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivationResult {
    pub toolchains: Vec<ActivatedToolchain>,
    /// Executable name to the path that wins on the search path.
    pub executables: BTreeMap<String, PathBuf>,
    /// Variables set by toolchains.
    pub variables_set: Vec<String>,
    pub hooks: Option<InstallReport>,
    pub dotenv: DotenvOutcome,
    pub vars_loaded: Vec<String>,
    /// Dotenv keys left alone because the context already had them.
    pub vars_skipped: Vec<String>,
    pub diagnostics: Vec<String>,
}

impl ActivationResult {
    pub fn hooks_installed(&self) -> &[String] {
        self.hooks.as_ref().map_or(&[], |r| r.hooks.as_slice())
    }
}

/// Applies resolved providers to a shell context.
///
/// Order is fixed: toolchain exposure, hook installation, dotenv loading.
/// A failure in the first two phases undoes everything applied so far.
/// Dotenv problems only produce diagnostics.
pub struct Activator<'a> {
    project_root: &'a Path,
    toolchains: &'a dyn ToolchainInstaller,
    hooks: Option<&'a dyn HookInstaller>,
    label: String,
}

impl<'a> Activator<'a> {
    pub fn new(project_root: &'a Path, toolchains: &'a dyn ToolchainInstaller) -> Self {
        Self {
            project_root,
            toolchains,
            hooks: None,
            label: String::new(),
        }
    }

    #[must_use]
    pub fn with_hook_installer(mut self, installer: &'a dyn HookInstaller) -> Self {
        self.hooks = Some(installer);
        self
    }

    /// Descriptor short id written into generated hook scripts.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn activate(
        &self,
        providers: &[ResolvedProvider],
        dotenv: &DotenvPolicy,
        ctx: &mut dyn ShellContext,
    ) -> Result<ActivationResult, ActivationError> {
        let mut journal = ActivationJournal::new();
        let mut result = ActivationResult::default();

        let applied = self
            .expose_toolchains(providers, ctx, &mut journal, &mut result)
            .and_then(|front| self.install_hooks(providers, front, &mut journal, &mut result));
        if let Err(e) = applied {
            warn!("activation failed, rolling back {} step(s): {e}", journal.len());
            journal.rollback(ctx, self.hooks);
            return Err(e);
        }

        self.load_dotenv(dotenv, ctx, &mut result);
        info!(
            "activated {} toolchain(s), {} hook(s), {} dotenv variable(s)",
            result.toolchains.len(),
            result.hooks_installed().len(),
            result.vars_loaded.len()
        );
        Ok(result)
    }

    /// Returns the directories now at the front of the search path.
    fn expose_toolchains(
        &self,
        providers: &[ResolvedProvider],
        ctx: &mut dyn ShellContext,
        journal: &mut ActivationJournal,
        result: &mut ActivationResult,
    ) -> Result<Vec<PathBuf>, ActivationError> {
        let toolchains: Vec<&ResolvedProvider> = providers
            .iter()
            .filter(|p| p.kind == ProviderKind::Toolchain)
            .collect();

        // Everything is checked before the context is touched.
        for provider in &toolchains {
            self.toolchains.ensure(provider)?;
        }

        for provider in &toolchains {
            let bin_dirs: Vec<PathBuf> = provider.path_dirs().cloned().collect();
            for effect in &provider.activation_effects {
                if let Effect::SetVar { key, value } = effect {
                    if ctx.var(key).as_deref() != Some(value) {
                        journal.record_var(ctx, key);
                        ctx.set_var(key, value);
                    }
                    if !result.variables_set.contains(key) {
                        result.variables_set.push(key.clone());
                    }
                }
            }
            for exe in &provider.executable_refs {
                if let Some(name) = exe.file_name() {
                    result
                        .executables
                        .insert(name.to_string_lossy().into_owned(), exe.clone());
                }
            }
            result.toolchains.push(ActivatedToolchain {
                name: provider.name.clone(),
                version: provider.version.clone(),
                bin_dirs,
            });
        }

        let front = precedence_dirs(providers);
        if front.is_empty() {
            return Ok(front);
        }

        let current = ctx.search_path();
        let mut search_path = front.clone();
        search_path.extend(current.iter().filter(|d| !front.contains(d)).cloned());
        if search_path != current {
            journal.record(RollbackStep::RestoreVar {
                key: PATH_VAR.to_owned(),
                previous: ctx.var(PATH_VAR),
            });
            ctx.set_search_path(&search_path)?;
            debug!("search path now starts with {} toolchain dir(s)", front.len());
        }
        Ok(front)
    }

    fn install_hooks(
        &self,
        providers: &[ResolvedProvider],
        search_path: Vec<PathBuf>,
        journal: &mut ActivationJournal,
        result: &mut ActivationResult,
    ) -> Result<(), ActivationError> {
        let entries = hook_entries(providers);
        let Some(installer) = self.hooks else {
            if entries.is_empty() {
                return Ok(());
            }
            return Err(ActivationError::HookInstall(
                "hooks are declared but no hook installer is available".to_owned(),
            ));
        };

        // An empty entry list still runs so a previously managed hook is removed.
        let before = installer.snapshot()?;
        let report = installer.install(
            &entries,
            &HookScriptContext {
                search_path,
                label: self.label.clone(),
            },
        )?;
        journal.record(RollbackStep::RestoreHooks {
            before,
            after: installer.snapshot()?,
        });
        if entries.is_empty() {
            if report.changed {
                info!("removed pre-commit hook, no hooks are declared");
                result.hooks = Some(report);
            }
        } else {
            result.hooks = Some(report);
        }
        Ok(())
    }

    fn load_dotenv(
        &self,
        policy: &DotenvPolicy,
        ctx: &mut dyn ShellContext,
        result: &mut ActivationResult,
    ) {
        let outcome = load_dotenv(self.project_root, policy);
        match &outcome {
            DotenvOutcome::Loaded { entries, .. } => {
                for (key, value) in entries {
                    if !is_var_name(key) {
                        warn!("dotenv: {key} is not a valid variable name, skipping");
                        result.diagnostics.push(format!(
                            "dotenv key '{key}' is not a valid variable name, skipped"
                        ));
                    } else if ctx.var(key).is_some() {
                        debug!("dotenv: {key} already set, keeping existing value");
                        result.vars_skipped.push(key.clone());
                    } else {
                        ctx.set_var(key, value);
                        result.vars_loaded.push(key.clone());
                    }
                }
            }
            DotenvOutcome::Malformed { error } => {
                let line = error
                    .line
                    .map(|l| format!(" (line {l})"))
                    .unwrap_or_default();
                warn!("skipping malformed dotenv file{line}: {error}");
                result
                    .diagnostics
                    .push(format!("dotenv file skipped{line}: {error}"));
            }
            DotenvOutcome::Rejected { path, reason } => {
                warn!("refusing to load {}: {reason}", path.display());
                result
                    .diagnostics
                    .push(format!("dotenv file {} rejected: {reason}", path.display()));
            }
            DotenvOutcome::Missing { .. } | DotenvOutcome::Disabled => {}
        }
        result.dotenv = outcome;
    }
}

/// Toolchain bin directories in search-path order: the most recently
/// declared toolchain first, duplicates dropped.
pub fn precedence_dirs(providers: &[ResolvedProvider]) -> Vec<PathBuf> {
    let declared: Vec<&PathBuf> = providers
        .iter()
        .filter(|p| p.kind == ProviderKind::Toolchain)
        .flat_map(ResolvedProvider::path_dirs)
        .collect();
    let mut front: Vec<PathBuf> = Vec::new();
    for dir in declared.into_iter().rev() {
        if !front.contains(dir) {
            front.push(dir.clone());
        }
    }
    front
}

/// Hook entries in declaration order.
pub fn hook_entries(providers: &[ResolvedProvider]) -> Vec<HookEntry> {
    providers
        .iter()
        .filter(|p| p.kind == ProviderKind::Hook)
        .flat_map(|p| &p.activation_effects)
        .filter_map(|effect| match effect {
            Effect::InstallHook { name, command } => Some(HookEntry {
                name: name.clone(),
                command: command.clone(),
            }),
            _ => None,
        })
        .collect()
}
