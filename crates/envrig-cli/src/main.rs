mod commands;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;
use commands::{EXIT_ACTIVATION_ERROR, EXIT_DESCRIPTOR_ERROR, EXIT_FAILURE, EXIT_RESOLVE_ERROR};
use envrig_core::{ActivateOptions, Engine, EngineConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "envrig",
    version,
    about = "Declarative development environment activation"
)]
struct Cli {
    /// Project directory containing envrig.toml.
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    /// Directory holding installed toolchains (overrides config and ENVRIG_TOOLCHAINS).
    #[arg(long, global = true)]
    toolchains: Option<String>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, Args)]
struct ActivationFlags {
    /// Require an envrig.lock matching the current resolution.
    #[arg(long, default_value_t = false)]
    locked: bool,
    /// Do not install pre-commit hooks.
    #[arg(long, default_value_t = false)]
    no_hooks: bool,
    /// Do not load the dotenv file.
    #[arg(long, default_value_t = false)]
    no_dotenv: bool,
}

impl ActivationFlags {
    fn options(self) -> ActivateOptions {
        ActivateOptions {
            locked: self.locked,
            skip_hooks: self.no_hooks,
            skip_dotenv: self.no_dotenv,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a starter envrig.toml.
    Init {
        /// Built-in template (minimal, rust, python, go, node).
        #[arg(long)]
        template: Option<String>,
        /// Overwrite an existing descriptor.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Activate the project and print shell statements (use with eval).
    Activate {
        /// Shell syntax to emit (bash, zsh, fish, powershell). Defaults to $SHELL.
        #[arg(long)]
        shell: Option<String>,
        #[command(flatten)]
        flags: ActivationFlags,
    },
    /// Spawn $SHELL inside the activated environment.
    Shell {
        #[command(flatten)]
        flags: ActivationFlags,
    },
    /// Run one command inside the activated environment.
    Exec {
        #[command(flatten)]
        flags: ActivationFlags,
        /// Command and arguments to run.
        #[arg(required = true, last = true)]
        command: Vec<String>,
    },
    /// Print the providers the descriptor resolves to.
    Resolve,
    /// Write envrig.lock, or verify it with --check.
    Lock {
        /// Verify the existing lock file instead of writing it.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Manage the generated pre-commit hook.
    Hooks {
        #[command(subcommand)]
        action: HooksAction,
    },
    /// Show descriptor, lock and hook state for the project.
    Status,
    /// Run diagnostic checks on the project and toolchains.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: CompletionShell,
    },
    /// Write man pages for envrig and every subcommand into DIR.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum HooksAction {
    /// Install the declared hooks without touching the shell environment.
    Install,
    /// Remove the generated hook and restore any previous one.
    Uninstall,
    /// Compare declared and installed hooks.
    Status,
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    // stdout carries eval-able output; logs always go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("ENVRIG_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let result = load_engine(cli.toolchains.as_deref())
        .and_then(|engine| dispatch(&engine, &cli.project, cli.command, cli.json));

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn load_engine(toolchains: Option<&str>) -> Result<Engine, String> {
    let mut config = EngineConfig::load_default().map_err(|e| e.to_string())?;
    if let Some(root) = toolchains {
        config = config.with_toolchains_root(expand_tilde(root));
    }
    tracing::debug!("toolchains root: {}", config.toolchains_root.display());
    Ok(Engine::new(config))
}

fn dispatch(
    engine: &Engine,
    project: &std::path::Path,
    command: Commands,
    json_output: bool,
) -> Result<u8, String> {
    match command {
        Commands::Init { template, force } => {
            commands::init::run(engine, project, template.as_deref(), force, json_output)
        }
        Commands::Activate { shell, flags } => commands::activate::run(
            engine,
            project,
            shell.as_deref(),
            flags.options(),
            json_output,
        ),
        Commands::Shell { flags } => commands::shell::run(engine, project, flags.options()),
        Commands::Exec { flags, command } => {
            commands::exec::run(engine, project, flags.options(), &command)
        }
        Commands::Resolve => commands::resolve::run(engine, project, json_output),
        Commands::Lock { check } => commands::lock::run(engine, project, check, json_output),
        Commands::Hooks { action } => match action {
            HooksAction::Install => commands::hooks::install(engine, project, json_output),
            HooksAction::Uninstall => commands::hooks::uninstall(engine, project, json_output),
            HooksAction::Status => commands::hooks::status(engine, project, json_output),
        },
        Commands::Status => commands::status::run(engine, project, json_output),
        Commands::Doctor => commands::doctor::run(engine, project, json_output),
        Commands::Completions { shell } => commands::completions::run(Cli::command(), shell),
        Commands::ManPages { dir } => commands::man_pages::run(Cli::command(), &dir),
    }
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("descriptor error:") || msg.starts_with("lock error:") {
        EXIT_DESCRIPTOR_ERROR
    } else if msg.starts_with("resolution error:") {
        EXIT_RESOLVE_ERROR
    } else if msg.starts_with("activation error:") {
        EXIT_ACTIVATION_ERROR
    } else {
        EXIT_FAILURE
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
