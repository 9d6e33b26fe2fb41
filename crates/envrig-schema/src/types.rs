//! Identifier newtypes and the provider kind shared by the schema and core crates.
//!
//! Identifiers serialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }

            /// Leading 12 characters, the display form used in diagnostics.
            pub fn short(&self) -> ShortId {
                ShortId(self.0.chars().take(12).collect())
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Full 64-character hex identifier of a locked, resolved environment.
    EnvId
);

string_newtype!(
    /// Full 64-character hex identifier derived from normalized descriptor content.
    DescriptorId
);

string_newtype!(
    /// Truncated 12-character prefix of an identifier, used for display.
    ShortId
);

/// What a provider contributes to an activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Toolchain,
    Hook,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Toolchain => "toolchain",
            ProviderKind::Hook => "hook",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_id_display_and_as_ref() {
        let id = EnvId::new("abc123");
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(id.as_str(), "abc123");
        assert_eq!(AsRef::<str>::as_ref(&id), "abc123");
    }

    #[test]
    fn descriptor_id_serializes_as_plain_string() {
        let id = DescriptorId::new("deadbeef");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"deadbeef\"");
        let back: DescriptorId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn short_form_truncates_to_twelve_chars() {
        let sid = EnvId::from("abc123def456789").short();
        assert!(sid == *"abc123def456");
        assert_eq!(sid.into_inner(), "abc123def456");
    }

    #[test]
    fn provider_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::Toolchain).unwrap(),
            "\"toolchain\""
        );
        let kind: ProviderKind = serde_json::from_str("\"hook\"").unwrap();
        assert_eq!(kind, ProviderKind::Hook);
        assert_eq!(kind.to_string(), "hook");
    }

    #[test]
    fn toolchains_sort_before_hooks() {
        assert!(ProviderKind::Toolchain < ProviderKind::Hook);
    }
}
