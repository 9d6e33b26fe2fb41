use super::{EXIT_FAILURE, EXIT_SUCCESS};
use envrig_core::{
    config::config_path, load_dotenv, DotenvOutcome, Engine, GitHookInstaller, HookInstaller,
    LockStatus, PrefixInstaller, ProjectStatus, Resolution, ToolchainInstaller,
};
use envrig_schema::ProviderKind;
use std::path::Path;

pub fn run(engine: &Engine, project: &Path, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    check_config(engine, &mut checks);

    match engine.resolve(project) {
        Ok(resolution) => {
            checks.push(Check::pass(
                "descriptor",
                &format!(
                    "Descriptor valid ({}, {} provider(s))",
                    resolution.project.identity.short_id,
                    resolution.providers.len()
                ),
            ));
            check_toolchains(engine, &resolution, &mut checks, &mut all_pass);
            check_git(project, &resolution, &mut checks, &mut all_pass);
            check_dotenv(project, &resolution, &mut checks);
            if let Ok(status) = engine.status(project) {
                check_status(&status, &mut checks, &mut all_pass);
            }
        }
        Err(e) => {
            all_pass = false;
            checks.push(Check::fail("descriptor", &e.to_string()));
        }
    }

    print_results(&checks, all_pass, json_output)
}

fn check_config(engine: &Engine, checks: &mut Vec<Check>) {
    match config_path() {
        Some(path) if path.exists() => checks.push(Check::info(
            "config",
            &format!("Using config {}", path.display()),
        )),
        _ => checks.push(Check::info("config", "No config file, using defaults")),
    }
    let root = &engine.config().toolchains_root;
    if root.is_dir() {
        checks.push(Check::pass(
            "toolchains_root",
            &format!("Toolchains root {}", root.display()),
        ));
    } else {
        checks.push(Check::warn(
            "toolchains_root",
            &format!(
                "Toolchains root {} does not exist (set ENVRIG_TOOLCHAINS or --toolchains)",
                root.display()
            ),
        ));
    }
}

fn check_toolchains(
    engine: &Engine,
    resolution: &Resolution,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) {
    let installer = PrefixInstaller;
    for provider in resolution
        .providers
        .iter()
        .filter(|p| p.kind == ProviderKind::Toolchain)
    {
        let label = match &provider.version {
            Some(v) => format!("{}@{v}", provider.name),
            None => provider.name.clone(),
        };
        match installer.ensure(provider) {
            Ok(()) => checks.push(Check::pass(
                "toolchain",
                &format!(
                    "{label}: {} executable(s) present",
                    provider.executable_refs.len()
                ),
            )),
            Err(e) => {
                *all_pass = false;
                checks.push(Check::fail("toolchain", &e.to_string()));
            }
        }
    }
    if engine.registry().is_empty() {
        checks.push(Check::warn("registry", "Provider registry is empty"));
    }
}

fn check_git(
    project: &Path,
    resolution: &Resolution,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) {
    let wants_hooks = resolution
        .providers
        .iter()
        .any(|p| p.kind == ProviderKind::Hook);
    match GitHookInstaller::discover(project) {
        Ok(installer) => {
            checks.push(Check::pass(
                "git_repository",
                &format!("Hooks directory {}", installer.hooks_dir().display()),
            ));
            if installer.legacy_path().exists() {
                checks.push(Check::info(
                    "legacy_hook",
                    &format!("Chaining existing hook {}", installer.legacy_path().display()),
                ));
            }
            if let Err(e) = installer.installed() {
                checks.push(Check::warn("hook_file", &e.to_string()));
            }
        }
        Err(e) if wants_hooks => {
            *all_pass = false;
            checks.push(Check::fail("git_repository", &e.to_string()));
        }
        Err(_) => checks.push(Check::info(
            "git_repository",
            "Not a git repository (no hooks declared)",
        )),
    }
}

fn check_dotenv(project: &Path, resolution: &Resolution, checks: &mut Vec<Check>) {
    match load_dotenv(project, &resolution.project.normalized.dotenv) {
        DotenvOutcome::Disabled => checks.push(Check::info("dotenv", "Dotenv loading disabled")),
        DotenvOutcome::Missing { path } => checks.push(Check::info(
            "dotenv",
            &format!("{} not found (skipped at activation)", path.display()),
        )),
        DotenvOutcome::Rejected { path, reason } => checks.push(Check::warn(
            "dotenv",
            &format!("{} rejected: {reason}", path.display()),
        )),
        DotenvOutcome::Malformed { error } => {
            checks.push(Check::warn("dotenv", &format!("Malformed dotenv: {error}")));
        }
        DotenvOutcome::Loaded { path, entries } => checks.push(Check::pass(
            "dotenv",
            &format!("{} parses ({} entries)", path.display(), entries.len()),
        )),
    }
}

fn check_status(status: &ProjectStatus, checks: &mut Vec<Check>, all_pass: &mut bool) {
    if status.git_repository && status.hooks_declared != status.hooks_installed {
        checks.push(Check::warn(
            "hooks_sync",
            "Installed hooks differ from the descriptor (run 'envrig hooks install')",
        ));
    }
    match &status.lock {
        LockStatus::Missing => checks.push(Check::info("lock", "No envrig.lock")),
        LockStatus::Current => checks.push(Check::pass("lock", "Lock file is current")),
        LockStatus::Stale(detail) => checks.push(Check::warn(
            "lock",
            &format!("Lock file is stale: {detail}"),
        )),
        LockStatus::Invalid(detail) => {
            *all_pass = false;
            checks.push(Check::fail(
                "lock",
                &format!("Lock file is invalid: {detail}"),
            ));
        }
    }
}

fn print_results(checks: &[Check], all_pass: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks.iter().map(|c| serde_json::json!({
                "name": c.name,
                "status": c.status,
                "message": c.message,
            })).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?
        );
    } else {
        println!("envrig doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn info(name: &'static str, message: &str) -> Self {
        Self::new(name, "info", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_lock_fails_the_run() {
        let status = ProjectStatus {
            descriptor_path: "envrig.toml".into(),
            short_id: "abc".to_owned(),
            languages: Vec::new(),
            hooks_declared: Vec::new(),
            hooks_installed: Vec::new(),
            git_repository: false,
            dotenv: envrig_schema::DotenvPolicy::disabled(),
            lock: LockStatus::Invalid("bad".to_owned()),
        };
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_status(&status, &mut checks, &mut all_pass);
        assert!(!all_pass);
        assert_eq!(checks[0].status, "fail");
    }

    #[test]
    fn stale_lock_and_hook_drift_only_warn() {
        let status = ProjectStatus {
            descriptor_path: "envrig.toml".into(),
            short_id: "abc".to_owned(),
            languages: Vec::new(),
            hooks_declared: vec!["rustfmt".to_owned()],
            hooks_installed: Vec::new(),
            git_repository: true,
            dotenv: envrig_schema::DotenvPolicy::disabled(),
            lock: LockStatus::Stale("languages changed".to_owned()),
        };
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_status(&status, &mut checks, &mut all_pass);
        assert!(all_pass);
        assert!(checks.iter().all(|c| c.status == "warn"));
    }
}
