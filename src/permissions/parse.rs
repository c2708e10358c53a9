//! Parsing permissions from frontmatter YAML.

use super::{PermissionLevel, PermissionScope, Permissions, ScopeMap, Shorthand};
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use thiserror::Error;

/// Reasons a `permissions` value is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("unknown permission scope '{scope}'")]
    UnknownScope { scope: String },

    #[error("invalid level '{value}' for scope '{scope}' (expected none, read or write)")]
    InvalidLevel { scope: String, value: String },

    #[error("invalid permissions shorthand '{0}' (expected read-all, write-all or none)")]
    InvalidShorthand(String),

    #[error("id-token does not support 'read'; use 'write' or 'none'")]
    IdTokenRead,

    #[error("permissions must be a shorthand string or a mapping of scope to level")]
    InvalidShape,
}

impl PermissionError {
    /// Path of the offending entry relative to the `permissions` key.
    pub fn field_suffix(&self) -> String {
        match self {
            PermissionError::UnknownScope { scope } | PermissionError::InvalidLevel { scope, .. } => {
                format!("/{}", scope)
            }
            PermissionError::IdTokenRead => "/id-token".to_string(),
            PermissionError::InvalidShorthand(_) | PermissionError::InvalidShape => String::new(),
        }
    }
}

impl Permissions {
    /// Parse a `permissions` value: a shorthand token or a mapping.
    ///
    /// A mapping may contain an `all` key, which produces the blanket
    /// representation with the remaining keys as overrides.
    pub fn from_yaml(value: &Value) -> Result<Self, PermissionError> {
        match value {
            Value::Null => Ok(Permissions::default()),
            Value::String(token) => Shorthand::parse(token)
                .map(Permissions::Shorthand)
                .ok_or_else(|| PermissionError::InvalidShorthand(token.clone())),
            Value::Mapping(mapping) => {
                let mut blanket = None;
                let mut map = ScopeMap::new();

                for (key, raw_level) in mapping {
                    let key = key.as_str().ok_or(PermissionError::InvalidShape)?;
                    let level = raw_level
                        .as_str()
                        .and_then(PermissionLevel::parse)
                        .ok_or_else(|| PermissionError::InvalidLevel {
                            scope: key.to_string(),
                            value: yaml_scalar_text(raw_level),
                        })?;

                    if key == "all" {
                        blanket = Some(level);
                        continue;
                    }

                    let scope = PermissionScope::parse(key).ok_or_else(|| {
                        PermissionError::UnknownScope {
                            scope: key.to_string(),
                        }
                    })?;
                    if !scope.accepts(level) {
                        return Err(PermissionError::IdTokenRead);
                    }
                    map.insert(scope, level);
                }

                Ok(match blanket {
                    Some(level) => Permissions::Blanket {
                        level,
                        overrides: map,
                    },
                    None => Permissions::Explicit(map),
                })
            }
            _ => Err(PermissionError::InvalidShape),
        }
    }

    /// Parse permissions from rendered YAML text (the inverse of `Display`).
    pub fn from_yaml_str(text: &str) -> Result<Self, PermissionError> {
        let value: Value = serde_yaml::from_str(text).map_err(|_| PermissionError::InvalidShape)?;
        Self::from_yaml(&value)
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Permissions::from_yaml(&value).map_err(serde::de::Error::custom)
    }
}

fn yaml_scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        _ => "<non-scalar>".to_string(),
    }
}
