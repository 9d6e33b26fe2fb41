use crate::normalize::NormalizedDescriptor;
use crate::types::{DescriptorId, ShortId};
use serde::Serialize;

/// Deterministic identity of a descriptor's declared intent.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DescriptorIdentity {
    pub descriptor_id: DescriptorId,
    pub short_id: ShortId,
}

/// Hash the normalized descriptor.
///
/// Only enabled entries take part, so toggling an entry off and deleting it
/// produce the same identity. Declaration order is significant: it decides
/// path precedence and hook order.
pub fn compute_descriptor_id(
    normalized: &NormalizedDescriptor,
) -> Result<DescriptorIdentity, serde_json::Error> {
    let mut hasher = blake3::Hasher::new();
    hasher.update(normalized.canonical_json()?.as_bytes());

    for lang in &normalized.languages {
        let version = lang.version.as_deref().unwrap_or("*");
        hasher.update(format!("lang:{}@{version}", lang.name).as_bytes());
    }
    for hook in &normalized.hooks {
        hasher.update(format!("hook:{}", hook.name).as_bytes());
        for arg in &hook.args {
            hasher.update(format!("arg:{arg}").as_bytes());
        }
    }
    if normalized.dotenv.enabled {
        hasher.update(format!("dotenv:{}", normalized.dotenv.filename).as_bytes());
    }

    let descriptor_id = DescriptorId::new(hasher.finalize().to_hex().to_string());
    let short_id = descriptor_id.short();
    Ok(DescriptorIdentity {
        descriptor_id,
        short_id,
    })
}
