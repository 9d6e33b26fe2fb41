use crate::CoreError;
use envrig_schema::{DESCRIPTOR_FILE, LOCK_FILE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const TOOLCHAINS_ENV: &str = "ENVRIG_TOOLCHAINS";

/// User-level settings, read from `$XDG_CONFIG_HOME/envrig/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Directory holding `<name>/<version>/bin` toolchain trees.
    #[serde(default = "default_toolchains_root")]
    pub toolchains_root: PathBuf,
    #[serde(default = "default_descriptor_file")]
    pub descriptor_file: String,
    #[serde(default = "default_lock_file")]
    pub lock_file: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            toolchains_root: default_toolchains_root(),
            descriptor_file: default_descriptor_file(),
            lock_file: default_lock_file(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
    }

    /// The user config file if it exists, defaults otherwise, then
    /// environment overrides.
    pub fn load_default() -> Result<Self, CoreError> {
        let config = match config_path() {
            Some(path) if path.exists() => {
                debug!("loading config from {}", path.display());
                Self::load(&path)?
            }
            _ => Self::default(),
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    #[must_use]
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(root) = lookup(TOOLCHAINS_ENV).filter(|v| !v.is_empty()) {
            self.toolchains_root = PathBuf::from(root);
        }
        self
    }

    #[must_use]
    pub fn with_toolchains_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.toolchains_root = root.into();
        self
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let content = toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}

pub fn config_path() -> Option<PathBuf> {
    xdg_dir("XDG_CONFIG_HOME", ".config").map(|d| d.join("envrig").join("config.toml"))
}

fn default_toolchains_root() -> PathBuf {
    xdg_dir("XDG_DATA_HOME", ".local/share")
        .map_or_else(|| PathBuf::from(".envrig/toolchains"), |d| d.join("envrig").join("toolchains"))
}

fn default_descriptor_file() -> String {
    DESCRIPTOR_FILE.to_owned()
}

fn default_lock_file() -> String {
    LOCK_FILE.to_owned()
}

fn xdg_dir(var: &str, home_relative: &str) -> Option<PathBuf> {
    match std::env::var_os(var) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => std::env::var_os("HOME").map(|home| PathBuf::from(home).join(home_relative)),
    }
}
