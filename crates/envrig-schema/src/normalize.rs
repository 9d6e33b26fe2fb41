use crate::descriptor::{EnvironmentDescriptor, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Canonical representation of a loaded descriptor.
///
/// Disabled entries are dropped, names are lowercased, versions are trimmed
/// and the dotenv filename is reduced to a root-relative path. Declaration
/// order is kept. This is the input to resolution, identity hashing and lock
/// file generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedDescriptor {
    pub languages: Vec<NormalizedLanguage>,
    pub hooks: Vec<NormalizedHook>,
    pub dotenv: DotenvPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedLanguage {
    pub name: String,
    pub version: Option<String>,
    /// Dotted path of the entry in the descriptor, for diagnostics.
    #[serde(skip)]
    pub key_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedHook {
    pub name: String,
    pub args: Vec<String>,
    #[serde(skip)]
    pub key_path: String,
}

/// Whether and where to load a dotenv file, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DotenvPolicy {
    pub enabled: bool,
    pub filename: String,
}

impl DotenvPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            filename: ".env".to_owned(),
        }
    }
}

impl EnvironmentDescriptor {
    pub fn normalize(&self) -> Result<NormalizedDescriptor, SchemaError> {
        let mut seen = BTreeSet::new();
        let mut languages = Vec::new();
        for (key, config) in &self.languages {
            let key_path = format!("languages.{key}");
            let name = normalize_name(&key_path, key, &mut seen)?;
            if !config.enabled {
                continue;
            }
            let version = config
                .version
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned);
            languages.push(NormalizedLanguage {
                name,
                version,
                key_path,
            });
        }

        seen.clear();
        let mut hooks = Vec::new();
        for (key, config) in &self.hooks {
            let key_path = format!("hooks.{key}");
            let name = normalize_name(&key_path, key, &mut seen)?;
            if !config.enabled {
                continue;
            }
            hooks.push(NormalizedHook {
                name,
                args: config.args.clone(),
                key_path,
            });
        }

        let filename = normalize_relative_path("dotenv.filename", &self.dotenv.filename)?;

        Ok(NormalizedDescriptor {
            languages,
            hooks,
            dotenv: DotenvPolicy {
                enabled: self.dotenv.enabled,
                filename,
            },
        })
    }
}

impl NormalizedDescriptor {
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn normalize_name(
    key_path: &str,
    key: &str,
    seen: &mut BTreeSet<String>,
) -> Result<String, SchemaError> {
    let name = key.trim().to_lowercase();
    if !seen.insert(name.clone()) {
        return Err(SchemaError::InvalidValue {
            path: key_path.to_owned(),
            reason: format!("duplicate entry '{name}' (names are case-insensitive)"),
        });
    }
    Ok(name)
}

/// Reduce `raw` to a clean path relative to the project root.
///
/// Absolute paths and `..` segments that climb above the root are rejected.
pub fn normalize_relative_path(key_path: &str, raw: &str) -> Result<String, SchemaError> {
    let invalid = |reason: &str| SchemaError::InvalidValue {
        path: key_path.to_owned(),
        reason: format!("'{raw}' {reason}"),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("is empty"));
    }
    let path = Path::new(trimmed);
    if path.is_absolute() || path.has_root() {
        return Err(invalid("must be relative to the project root"));
    }

    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(invalid("escapes the project root"));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(invalid("must be relative to the project root"));
            }
        }
    }
    if parts.is_empty() {
        return Err(invalid("does not name a file"));
    }

    let clean: PathBuf = parts.iter().collect();
    Ok(clean.to_string_lossy().into_owned())
}
