use crate::descriptor::SchemaError;
use crate::identity::compute_descriptor_id;
use crate::normalize::{DotenvPolicy, NormalizedDescriptor};
use crate::types::{EnvId, ProviderKind, ShortId};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Conventional lock file name, next to the descriptor.
pub const LOCK_FILE: &str = "envrig.lock";

const LOCK_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("descriptor error: {0}")]
    Schema(#[from] SchemaError),
    #[error("lock file I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("lock file parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("lock file serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("canonical encoding failed: {0}")]
    Canonical(#[from] serde_json::Error),
    #[error("unsupported lock_version {0}, expected {LOCK_VERSION}")]
    UnsupportedVersion(u32),
    #[error("lock file env_id mismatch: lock has '{lock_id}', recomputed '{computed_id}'")]
    EnvIdMismatch {
        lock_id: String,
        computed_id: String,
    },
    #[error("lock file drift: {0}")]
    Drift(String),
}

/// A provider pinned by a previous resolution.
///
/// Executables are recorded by file name only; the toolchains root they live
/// under is machine-local and not part of the locked state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockedProvider {
    pub kind: ProviderKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub executables: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

/// Output of a resolution, in the shape the lock file records.
#[derive(Debug, Clone)]
pub struct ResolutionResult {
    /// Fingerprint of the provider registry the resolution ran against.
    pub registry_fingerprint: String,
    /// Providers in activation order: toolchains, then hooks.
    pub providers: Vec<LockedProvider>,
}

/// Fully resolved state of a project's environment.
///
/// `env_id` is computed from the locked fields only, so the same lock file
/// always yields the same identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockFile {
    pub lock_version: u32,
    pub env_id: String,
    pub short_id: String,
    pub descriptor_id: String,
    pub registry_fingerprint: String,
    pub dotenv: DotenvPolicy,
    #[serde(default)]
    pub providers: Vec<LockedProvider>,
}

impl LockFile {
    pub fn from_resolved(
        normalized: &NormalizedDescriptor,
        resolution: &ResolutionResult,
    ) -> Result<Self, LockError> {
        let descriptor = compute_descriptor_id(normalized)?;
        let lock = LockFile {
            lock_version: LOCK_VERSION,
            env_id: String::new(),
            short_id: String::new(),
            descriptor_id: descriptor.descriptor_id.into_inner(),
            registry_fingerprint: resolution.registry_fingerprint.clone(),
            dotenv: normalized.dotenv.clone(),
            providers: resolution.providers.clone(),
        };

        let (env_id, short_id) = lock.compute_identity();
        Ok(LockFile {
            env_id: env_id.into_inner(),
            short_id: short_id.into_inner(),
            ..lock
        })
    }

    /// Hash the locked fields. `env_id` and `short_id` themselves are excluded.
    pub fn compute_identity(&self) -> (EnvId, ShortId) {
        let mut hasher = blake3::Hasher::new();
        hasher.update(format!("lock:{}", self.lock_version).as_bytes());
        hasher.update(format!("descriptor:{}", self.descriptor_id).as_bytes());
        hasher.update(format!("registry:{}", self.registry_fingerprint).as_bytes());

        for provider in &self.providers {
            hasher.update(
                format!(
                    "provider:{}:{}@{}",
                    provider.kind,
                    provider.name,
                    provider.version.as_deref().unwrap_or("-")
                )
                .as_bytes(),
            );
            for exe in &provider.executables {
                hasher.update(format!("exe:{exe}").as_bytes());
            }
            for part in &provider.command {
                hasher.update(format!("cmd:{part}").as_bytes());
            }
        }

        if self.dotenv.enabled {
            hasher.update(format!("dotenv:{}", self.dotenv.filename).as_bytes());
        }

        let env_id = EnvId::new(hasher.finalize().to_hex().to_string());
        let short_id = env_id.short();
        (env_id, short_id)
    }

    pub fn verify_integrity(&self) -> Result<EnvId, LockError> {
        if self.lock_version != LOCK_VERSION {
            return Err(LockError::UnsupportedVersion(self.lock_version));
        }
        let (env_id, _) = self.compute_identity();
        if self.env_id != env_id.as_str() {
            return Err(LockError::EnvIdMismatch {
                lock_id: self.env_id.clone(),
                computed_id: env_id.into_inner(),
            });
        }
        Ok(env_id)
    }

    /// Check that the descriptor still declares what this lock was made from.
    pub fn verify_descriptor_intent(
        &self,
        normalized: &NormalizedDescriptor,
    ) -> Result<(), LockError> {
        for lang in &normalized.languages {
            if !self.contains(ProviderKind::Toolchain, &lang.name) {
                return Err(LockError::Drift(format!(
                    "language '{}' is enabled in the descriptor but not in the lock file. Run 'envrig lock' to re-resolve.",
                    lang.name
                )));
            }
        }
        for hook in &normalized.hooks {
            if !self.contains(ProviderKind::Hook, &hook.name) {
                return Err(LockError::Drift(format!(
                    "hook '{}' is enabled in the descriptor but not in the lock file. Run 'envrig lock' to re-resolve.",
                    hook.name
                )));
            }
        }
        if self.dotenv != normalized.dotenv {
            return Err(LockError::Drift(
                "dotenv policy changed. Run 'envrig lock' to re-resolve.".to_owned(),
            ));
        }

        let current = compute_descriptor_id(normalized)?;
        if self.descriptor_id != current.descriptor_id.as_str() {
            return Err(LockError::Drift(format!(
                "descriptor changed since the lock was written (lock {}, descriptor {}). Run 'envrig lock' to re-resolve.",
                &self.descriptor_id[..self.descriptor_id.len().min(12)],
                current.short_id
            )));
        }
        Ok(())
    }

    fn contains(&self, kind: ProviderKind, name: &str) -> bool {
        self.providers
            .iter()
            .any(|p| p.kind == kind && p.name == name)
    }

    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), LockError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        let dir = path.parent().unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        std::io::Write::write_all(&mut tmp, content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| LockError::Io(e.error))?;
        Ok(())
    }

    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
