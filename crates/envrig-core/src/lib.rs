//! Resolution and activation engine for envrig.
//!
//! This crate turns a normalized descriptor into an activated environment: the
//! `ProviderRegistry` maps every enabled entry to a `ResolvedProvider`, the
//! `Activator` applies toolchain exposure, git pre-commit hook installation and
//! dotenv loading to an injected `ShellContext` (in that order, with rollback
//! on fatal errors), and the `Engine` ties it together with lock files and
//! configuration.

pub mod activator;
pub mod config;
pub mod context;
pub mod dotenv;
pub mod engine;
pub mod hook_catalog;
pub mod hooks;
pub mod journal;
pub mod language;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod shell;
pub mod toolchain;

pub use activator::{
    hook_entries, precedence_dirs, ActivatedToolchain, ActivationResult, Activator,
};
pub use config::EngineConfig;
pub use context::{is_var_name, ContextDiff, MemoryContext, ShellContext};
pub use dotenv::{load_dotenv, DotenvOutcome, DotenvParseError};
pub use engine::{
    ActivateOptions, ActivationReport, Engine, LoadedProject, LockStatus, ProjectStatus,
    Resolution,
};
pub use hook_catalog::HookProvider;
pub use hooks::{
    GitHookInstaller, HookEntry, HookInstaller, HookScriptContext, HookSnapshot, InstallReport,
};
pub use journal::{ActivationJournal, RollbackStep};
pub use language::LanguageProvider;
pub use provider::{Effect, Provider, ProviderRequest, ResolvedProvider};
pub use registry::ProviderRegistry;
pub use resolver::{resolution_result, resolve};
pub use shell::Shell;
pub use toolchain::{PrefixInstaller, ToolchainInstaller};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown language '{name}' at '{key_path}' (known: {known})")]
    UnknownLanguage {
        name: String,
        key_path: String,
        known: String,
    },
    #[error("unknown hook '{name}' at '{key_path}' (known: {known})")]
    UnknownHook {
        name: String,
        key_path: String,
        known: String,
    },
    #[error("no {name} version matches '{requested}' at '{key_path}' (available: {available})")]
    UnknownVersion {
        name: String,
        requested: String,
        key_path: String,
        available: String,
    },
}

impl ResolveError {
    pub fn key_path(&self) -> &str {
        match self {
            Self::UnknownLanguage { key_path, .. }
            | Self::UnknownHook { key_path, .. }
            | Self::UnknownVersion { key_path, .. } => key_path,
        }
    }
}

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("failed to install provider '{name}': {reason}")]
    ProviderInstall { name: String, reason: String },
    #[error("hook installation failed: {0}")]
    HookInstall(String),
    #[error("invalid search path: {0}")]
    Context(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("descriptor error: {0}")]
    Schema(#[from] envrig_schema::SchemaError),
    #[error("lock error: {0}")]
    Lock(#[from] envrig_schema::LockError),
    #[error("resolution error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("activation error: {0}")]
    Activation(#[from] ActivationError),
    #[error("config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
