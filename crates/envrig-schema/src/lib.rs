//! Descriptor parsing, validation, normalization, lock files, and identity for envrig.
//!
//! This crate defines the schema layer: TOML descriptor loading with key-path
//! diagnostics (`load`), the normalized form consumed by resolution
//! (`NormalizedDescriptor`), deterministic descriptor identity
//! (`compute_descriptor_id`), lock file generation/verification (`LockFile`),
//! and built-in starter presets.

pub mod descriptor;
pub mod identity;
pub mod lock;
pub mod normalize;
pub mod preset;
pub mod types;

pub use descriptor::{
    load, load_file, DotenvConfig, EnvironmentDescriptor, HookConfig, LanguageConfig, SchemaError,
    DESCRIPTOR_FILE,
};
pub use identity::{compute_descriptor_id, DescriptorIdentity};
pub use lock::{LockError, LockFile, LockedProvider, ResolutionResult, LOCK_FILE};
pub use normalize::{
    normalize_relative_path, DotenvPolicy, NormalizedDescriptor, NormalizedHook,
    NormalizedLanguage,
};
pub use preset::{get_preset, list_presets, Preset, BUILTIN_PRESETS};
pub use types::{DescriptorId, EnvId, ProviderKind, ShortId};
