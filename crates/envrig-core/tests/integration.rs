use envrig_core::{
    ActivateOptions, ActivationError, ActivationReport, CoreError, DotenvOutcome, Engine,
    EngineConfig, GitHookInstaller, HookInstaller, MemoryContext, ShellContext,
};
use envrig_schema::{ProviderKind, SchemaError};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;

const RUST_PROJECT: &str = r#"
[languages.rust]
enable = true
version = "1.80"

[hooks.rustfmt]
enable = true

[hooks.clippy]
enable = true
args = ["--", "-D", "warnings"]

[dotenv]
enable = true
filename = ".env"
"#;

struct Fixture {
    project: tempfile::TempDir,
    toolchains: tempfile::TempDir,
    engine: Engine,
}

impl Fixture {
    fn new(descriptor: &str) -> Self {
        let project = tempfile::tempdir().unwrap();
        let toolchains = tempfile::tempdir().unwrap();
        git2::Repository::init(project.path()).unwrap();
        fs::write(project.path().join("envrig.toml"), descriptor).unwrap();
        let engine = Engine::new(EngineConfig::default().with_toolchains_root(toolchains.path()));
        Self {
            project,
            toolchains,
            engine,
        }
    }

    fn root(&self) -> &Path {
        self.project.path()
    }

    fn install_rust(&self) {
        let bin = self.toolchains.path().join("rust/1.80.1/bin");
        fs::create_dir_all(&bin).unwrap();
        for exe in ["cargo", "rustc", "rustdoc", "rustfmt", "cargo-clippy", "clippy-driver"] {
            fs::write(bin.join(exe), "").unwrap();
        }
    }

    fn hooks(&self) -> GitHookInstaller {
        GitHookInstaller::discover(self.root()).unwrap()
    }

    fn activate(&self, ctx: &mut MemoryContext) -> Result<ActivationReport, CoreError> {
        self.engine
            .activate(self.root(), ActivateOptions::default(), ctx)
    }
}

fn shell() -> MemoryContext {
    MemoryContext::new()
        .with_var("PATH", "/usr/local/bin:/usr/bin:/bin")
        .with_var("HOME", "/home/dev")
}

#[test]
fn rust_project_end_to_end() {
    let fx = Fixture::new(RUST_PROJECT);
    fx.install_rust();
    fs::write(fx.root().join(".env"), "FOO=bar\n").unwrap();

    let mut ctx = shell();
    let report = fx.activate(&mut ctx).unwrap();

    let toolchains: Vec<_> = report
        .providers
        .iter()
        .filter(|p| p.kind == ProviderKind::Toolchain)
        .collect();
    assert_eq!(toolchains.len(), 1);
    assert_eq!(toolchains[0].version.as_deref(), Some("1.80.1"));
    assert_eq!(report.result.hooks_installed(), ["rustfmt", "clippy"]);
    assert_eq!(fx.hooks().installed().unwrap(), vec!["rustfmt", "clippy"]);
    assert_eq!(ctx.var("FOO").as_deref(), Some("bar"));

    let bin = fx.toolchains.path().join("rust/1.80.1/bin");
    assert_eq!(ctx.search_path()[0], bin);
    assert_eq!(report.result.executables["cargo"], bin.join("cargo"));
}

#[test]
fn preset_foo_is_not_overridden() {
    let fx = Fixture::new(RUST_PROJECT);
    fx.install_rust();
    fs::write(fx.root().join(".env"), "FOO=bar\n").unwrap();

    let mut ctx = shell().with_var("FOO", "from-shell");
    let report = fx.activate(&mut ctx).unwrap();
    assert_eq!(ctx.var("FOO").as_deref(), Some("from-shell"));
    assert_eq!(report.result.vars_skipped, vec!["FOO"]);
}

#[test]
fn repeated_activation_converges() {
    let fx = Fixture::new(RUST_PROJECT);
    fx.install_rust();
    fs::write(fx.root().join(".env"), "FOO=bar\n").unwrap();

    let mut ctx = shell();
    fx.activate(&mut ctx).unwrap();
    let after_first = ctx.clone();
    let hook_file = fs::read(fx.hooks().hook_path()).unwrap();

    for _ in 0..3 {
        fx.activate(&mut ctx).unwrap();
    }
    assert_eq!(ctx, after_first);
    assert_eq!(fs::read(fx.hooks().hook_path()).unwrap(), hook_file);

    let path = ctx.search_path();
    let mut deduped = path.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(path.len(), deduped.len(), "no duplicate search path entries");
}

#[test]
fn missing_dotenv_is_not_an_error() {
    let fx = Fixture::new(RUST_PROJECT);
    fx.install_rust();

    let mut ctx = shell();
    let report = fx.activate(&mut ctx).unwrap();
    assert!(matches!(report.result.dotenv, DotenvOutcome::Missing { .. }));
    assert!(report.result.vars_loaded.is_empty());
    assert_eq!(ctx.var("HOME").as_deref(), Some("/home/dev"));
}

#[test]
fn disabled_language_resolves_no_toolchain() {
    let fx = Fixture::new(&RUST_PROJECT.replacen(
        "enable = true\nversion = \"1.80\"",
        "enable = false\nversion = \"1.80\"",
        1,
    ));
    fs::write(fx.root().join(".env"), "FOO=bar\n").unwrap();

    let mut ctx = shell();
    let report = fx.activate(&mut ctx).unwrap();
    assert!(report.result.toolchains.is_empty());
    assert_eq!(report.result.hooks_installed(), ["rustfmt", "clippy"]);
    assert_eq!(ctx.var("FOO").as_deref(), Some("bar"));
    assert_eq!(ctx.var("PATH").as_deref(), Some("/usr/local/bin:/usr/bin:/bin"));
}

#[test]
fn unknown_top_level_key_stops_before_resolution() {
    let fx = Fixture::new(&format!("{RUST_PROJECT}\n[services]\nenable = true\n"));
    fx.install_rust();

    let err = fx.engine.resolve(fx.root()).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Schema(SchemaError::UnknownKey { ref path, .. }) if path == "services"
    ));

    let mut ctx = shell();
    assert!(fx.activate(&mut ctx).is_err());
    assert_eq!(ctx, shell());
    assert!(!fx.hooks().hook_path().exists());
}

#[test]
fn hook_failure_rolls_back_toolchain_exposure() {
    let fx = Fixture::new(RUST_PROJECT);
    fx.install_rust();
    let hooks = fx.hooks();
    fs::create_dir_all(hooks.hooks_dir()).unwrap();
    fs::write(hooks.hook_path(), "#!/bin/sh\nmake lint\n").unwrap();
    fs::write(hooks.legacy_path(), "#!/bin/sh\nmake test\n").unwrap();

    let mut ctx = shell();
    let err = fx.activate(&mut ctx).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Activation(ActivationError::HookInstall(_))
    ));
    assert_eq!(ctx, shell());
    assert_eq!(
        fs::read_to_string(hooks.hook_path()).unwrap(),
        "#!/bin/sh\nmake lint\n"
    );
}

#[test]
fn foreign_hook_is_kept_and_chained() {
    let fx = Fixture::new(RUST_PROJECT);
    fx.install_rust();
    let hooks = fx.hooks();
    fs::create_dir_all(hooks.hooks_dir()).unwrap();
    fs::write(hooks.hook_path(), "#!/bin/sh\nmake lint\n").unwrap();

    fx.activate(&mut shell()).unwrap();
    assert_eq!(
        fs::read_to_string(hooks.legacy_path()).unwrap(),
        "#!/bin/sh\nmake lint\n"
    );

    assert!(fx.engine.uninstall_hooks(fx.root()).unwrap());
    assert_eq!(
        fs::read_to_string(hooks.hook_path()).unwrap(),
        "#!/bin/sh\nmake lint\n"
    );
}

#[test]
fn unknown_hook_is_a_resolution_error() {
    let fx = Fixture::new("[hooks.pylint]\nenable = true\n");
    let err = fx.engine.resolve(fx.root()).unwrap_err();
    match err {
        CoreError::Resolve(e) => assert_eq!(e.key_path(), "hooks.pylint"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn lock_then_check() {
    let fx = Fixture::new(RUST_PROJECT);
    let lock = fx.engine.lock(fx.root()).unwrap();
    assert_eq!(lock.providers.len(), 3);
    assert!(fx.root().join("envrig.lock").exists());
    let checked = fx.engine.check_lock(fx.root()).unwrap();
    assert_eq!(checked, lock);

    // Locking twice yields the same file.
    let again = fx.engine.lock(fx.root()).unwrap();
    assert_eq!(again.env_id, lock.env_id);
}

#[test]
fn concurrent_activations_leave_one_consistent_hook_file() {
    let fx = Arc::new(Fixture::new(RUST_PROJECT));
    fx.install_rust();

    let barrier = Arc::new(Barrier::new(4));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let fx = Arc::clone(&fx);
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let mut ctx = shell();
            fx.activate(&mut ctx).map(|_| ctx)
        }));
    }

    let contexts: Vec<MemoryContext> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    for ctx in &contexts[1..] {
        assert_eq!(ctx, &contexts[0]);
    }
    assert_eq!(fx.hooks().installed().unwrap(), vec!["rustfmt", "clippy"]);
}

#[test]
fn disabling_every_hook_removes_the_managed_script() {
    let fx = Fixture::new(RUST_PROJECT);
    fx.install_rust();
    let hooks = fx.hooks();
    fs::create_dir_all(hooks.hooks_dir()).unwrap();
    fs::write(hooks.hook_path(), "#!/bin/sh\nmake lint\n").unwrap();

    fx.activate(&mut shell()).unwrap();
    assert_eq!(hooks.installed().unwrap(), vec!["rustfmt", "clippy"]);

    fs::write(
        fx.root().join("envrig.toml"),
        RUST_PROJECT.replace(
            "enable = true\n\n[hooks.clippy]\nenable = true",
            "enable = false\n\n[hooks.clippy]\nenable = false",
        ),
    )
    .unwrap();
    let report = fx.activate(&mut shell()).unwrap();
    assert!(report.result.hooks.as_ref().is_some_and(|r| r.changed));
    assert!(report.result.hooks_installed().is_empty());
    assert_eq!(
        fs::read_to_string(hooks.hook_path()).unwrap(),
        "#!/bin/sh\nmake lint\n"
    );
    assert!(!hooks.legacy_path().exists());

    let report = fx.activate(&mut shell()).unwrap();
    assert!(report.result.hooks.is_none());
}

#[test]
fn concurrent_activations_over_foreign_hook_converge() {
    for _ in 0..10 {
        let fx = Arc::new(Fixture::new(RUST_PROJECT));
        fx.install_rust();
        let hooks = fx.hooks();
        fs::create_dir_all(hooks.hooks_dir()).unwrap();
        fs::write(hooks.hook_path(), "#!/bin/sh\nmake lint\n").unwrap();

        let barrier = Arc::new(Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let fx = Arc::clone(&fx);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    fx.activate(&mut shell()).map(|_| ())
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(
            fs::read_to_string(hooks.legacy_path()).unwrap(),
            "#!/bin/sh\nmake lint\n"
        );
        assert_eq!(hooks.installed().unwrap(), vec!["rustfmt", "clippy"]);
    }
}
