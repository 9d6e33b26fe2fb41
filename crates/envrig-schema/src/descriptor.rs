use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Conventional descriptor file name at the project root.
pub const DESCRIPTOR_FILE: &str = "envrig.toml";

const DEFAULT_DOTENV_FILENAME: &str = ".env";

const TOP_LEVEL_KEYS: &[&str] = &["languages", "hooks", "dotenv"];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read descriptor file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse descriptor: {0}")]
    Syntax(#[from] toml::de::Error),
    #[error("unknown key '{path}' (expected one of: {expected})")]
    UnknownKey { path: String, expected: String },
    #[error("'{path}' must be {expected}, found {found}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing required key '{path}'")]
    MissingField { path: String },
    #[error("invalid value at '{path}': {reason}")]
    InvalidValue { path: String, reason: String },
}

impl SchemaError {
    /// Dotted key path of the offending entry, when the error is tied to one.
    pub fn key_path(&self) -> Option<&str> {
        match self {
            Self::UnknownKey { path, .. }
            | Self::WrongType { path, .. }
            | Self::MissingField { path }
            | Self::InvalidValue { path, .. } => Some(path),
            Self::Io(_) | Self::Syntax(_) => None,
        }
    }
}

/// Root of a parsed `envrig.toml`.
///
/// Maps keep declaration order: toolchain precedence and hook installation
/// order both follow the order entries appear in the file.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentDescriptor {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub languages: IndexMap<String, LanguageConfig>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub hooks: IndexMap<String, HookConfig>,
    #[serde(default)]
    pub dotenv: DotenvConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LanguageConfig {
    #[serde(rename = "enable")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HookConfig {
    #[serde(rename = "enable")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DotenvConfig {
    #[serde(rename = "enable", default)]
    pub enabled: bool,
    #[serde(default = "default_dotenv_filename")]
    pub filename: String,
}

impl Default for DotenvConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            filename: default_dotenv_filename(),
        }
    }
}

fn default_dotenv_filename() -> String {
    DEFAULT_DOTENV_FILENAME.to_owned()
}

#[derive(Clone, Copy)]
enum FieldType {
    Bool,
    String,
    StringList,
}

impl FieldType {
    fn describe(self) -> &'static str {
        match self {
            FieldType::Bool => "a boolean",
            FieldType::String => "a string",
            FieldType::StringList => "an array of strings",
        }
    }
}

struct Field {
    name: &'static str,
    ty: FieldType,
    required: bool,
}

const LANGUAGE_FIELDS: &[Field] = &[
    Field {
        name: "enable",
        ty: FieldType::Bool,
        required: true,
    },
    Field {
        name: "version",
        ty: FieldType::String,
        required: false,
    },
];

const HOOK_FIELDS: &[Field] = &[
    Field {
        name: "enable",
        ty: FieldType::Bool,
        required: true,
    },
    Field {
        name: "args",
        ty: FieldType::StringList,
        required: false,
    },
];

const DOTENV_FIELDS: &[Field] = &[
    Field {
        name: "enable",
        ty: FieldType::Bool,
        required: false,
    },
    Field {
        name: "filename",
        ty: FieldType::String,
        required: false,
    },
];

/// Parse and fully validate a descriptor from TOML text.
///
/// The raw table is walked first so that every failure names the dotted key
/// path it came from; only then is the typed model deserialized.
pub fn load(raw: &str) -> Result<EnvironmentDescriptor, SchemaError> {
    let table: toml::Table = raw.parse()?;
    validate_root(&table)?;
    Ok(toml::Value::Table(table).try_into()?)
}

pub fn load_file(path: impl AsRef<Path>) -> Result<EnvironmentDescriptor, SchemaError> {
    let content = fs::read_to_string(path)?;
    load(&content)
}

fn validate_root(root: &toml::Table) -> Result<(), SchemaError> {
    for (key, value) in root {
        match key.as_str() {
            "languages" => validate_entries(key, value, LANGUAGE_FIELDS)?,
            "hooks" => validate_entries(key, value, HOOK_FIELDS)?,
            "dotenv" => {
                let table = expect_table(key, value)?;
                validate_fields(key, table, DOTENV_FIELDS)?;
            }
            _ => {
                return Err(SchemaError::UnknownKey {
                    path: key.clone(),
                    expected: TOP_LEVEL_KEYS.join(", "),
                })
            }
        }
    }
    Ok(())
}

fn validate_entries(
    section: &str,
    value: &toml::Value,
    fields: &[Field],
) -> Result<(), SchemaError> {
    let entries = expect_table(section, value)?;
    for (name, entry) in entries {
        let path = format!("{section}.{name}");
        validate_entry_name(&path, name)?;
        let table = expect_table(&path, entry)?;
        validate_fields(&path, table, fields)?;
    }
    Ok(())
}

fn validate_entry_name(path: &str, name: &str) -> Result<(), SchemaError> {
    if name.is_empty() {
        return Err(SchemaError::InvalidValue {
            path: path.to_owned(),
            reason: "entry name must not be empty".to_owned(),
        });
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(SchemaError::InvalidValue {
            path: path.to_owned(),
            reason: format!("entry name contains invalid character '{bad}'"),
        });
    }
    Ok(())
}

fn validate_fields(path: &str, table: &toml::Table, fields: &[Field]) -> Result<(), SchemaError> {
    for (key, value) in table {
        let field_path = format!("{path}.{key}");
        let Some(field) = fields.iter().find(|f| f.name == key) else {
            return Err(SchemaError::UnknownKey {
                path: field_path,
                expected: fields
                    .iter()
                    .map(|f| f.name)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        };
        check_type(&field_path, value, field.ty)?;
    }

    if let Some(missing) = fields
        .iter()
        .find(|f| f.required && !table.contains_key(f.name))
    {
        return Err(SchemaError::MissingField {
            path: format!("{path}.{}", missing.name),
        });
    }
    Ok(())
}

fn check_type(path: &str, value: &toml::Value, ty: FieldType) -> Result<(), SchemaError> {
    let ok = match ty {
        FieldType::Bool => value.is_bool(),
        FieldType::String => value.is_str(),
        FieldType::StringList => {
            let Some(items) = value.as_array() else {
                return Err(wrong_type(path, ty, value));
            };
            for (idx, item) in items.iter().enumerate() {
                if !item.is_str() {
                    return Err(wrong_type(&format!("{path}[{idx}]"), FieldType::String, item));
                }
            }
            true
        }
    };
    if ok {
        Ok(())
    } else {
        Err(wrong_type(path, ty, value))
    }
}

fn expect_table<'a>(path: &str, value: &'a toml::Value) -> Result<&'a toml::Table, SchemaError> {
    value.as_table().ok_or_else(|| SchemaError::WrongType {
        path: path.to_owned(),
        expected: "a table",
        found: value.type_str(),
    })
}

fn wrong_type(path: &str, ty: FieldType, value: &toml::Value) -> SchemaError {
    SchemaError::WrongType {
        path: path.to_owned(),
        expected: ty.describe(),
        found: value.type_str(),
    }
}
