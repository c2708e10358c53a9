//! Frontmatter validation.
//!
//! Validation runs in three passes before typed deserialization:
//!
//! 1. unknown top-level fields (with near-miss suggestions),
//! 2. the `permissions` block (so scope errors get their own kind),
//! 3. the embedded JSON schema (skippable).

use super::fields::{FRONTMATTER_FIELDS, IGNORED_FRONTMATTER_FIELDS};
use super::locate::FieldLocator;
use crate::error::{CompileError, Result, SchemaErrorKind};
use crate::permissions::{PermissionError, PermissionScope, Permissions};
use crate::suggest;
use jsonschema::Validator;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;

/// Embedded frontmatter schema.
const SCHEMA_JSON: &str = include_str!("../../schemas/frontmatter.schema.json");

static VALIDATOR: OnceLock<std::result::Result<Validator, String>> = OnceLock::new();

fn validator() -> Result<&'static Validator> {
    let compiled = VALIDATOR.get_or_init(|| {
        let schema: serde_json::Value = serde_json::from_str(SCHEMA_JSON)
            .map_err(|e| format!("failed to parse frontmatter schema: {}", e))?;
        Validator::new(&schema).map_err(|e| format!("failed to compile frontmatter schema: {}", e))
    });

    compiled
        .as_ref()
        .map_err(|reason| CompileError::configuration(reason.clone()))
}

/// Drop ignore-listed fields and reject any other unrecognized field.
pub(crate) fn check_fields(mapping: &mut Mapping, locator: &FieldLocator<'_>) -> Result<()> {
    let mut ignored = Vec::new();

    for key in mapping.keys() {
        let Some(name) = key.as_str() else {
            return Err(CompileError::Schema {
                kind: SchemaErrorKind::InvalidField,
                field_path: "/".to_string(),
                location: locator.locate(&[]),
                message: "frontmatter keys must be strings".to_string(),
            });
        };

        if FRONTMATTER_FIELDS.contains(&name) {
            continue;
        }
        if IGNORED_FRONTMATTER_FIELDS.contains(&name) {
            ignored.push(key.clone());
            continue;
        }

        let suggestions = suggest::rank(
            name,
            FRONTMATTER_FIELDS.iter().copied(),
            suggest::MAX_SUGGESTIONS,
        );
        let mut message = format!("unknown field '{}'", name);
        if !suggestions.is_empty() {
            message.push_str(". ");
            message.push_str(&suggest::did_you_mean(&suggestions));
        }
        return Err(CompileError::Schema {
            kind: SchemaErrorKind::UnknownField,
            field_path: format!("/{}", name),
            location: locator.locate(&[name]),
            message,
        });
    }

    for key in ignored {
        tracing::debug!(field = ?key, "ignoring frontmatter field");
        mapping.remove(&key);
    }
    Ok(())
}

/// Validate the `permissions` block, if present.
///
/// Unknown scopes are configuration errors with suggestions; malformed levels
/// are schema errors.
pub(crate) fn check_permissions(mapping: &Mapping, locator: &FieldLocator<'_>) -> Result<()> {
    let Some(value) = mapping.get("permissions") else {
        return Ok(());
    };

    let err = match Permissions::from_yaml(value) {
        Ok(_) => return Ok(()),
        Err(err) => err,
    };

    let field_path = format!("/permissions{}", err.field_suffix());
    let location = locator.locate_pointer(&field_path);

    Err(match err {
        PermissionError::UnknownScope { ref scope } => {
            let suggestions = suggest::rank(
                scope,
                PermissionScope::ALL.iter().map(|s| s.as_str()),
                suggest::MAX_SUGGESTIONS,
            );
            let mut message = err.to_string();
            if !suggestions.is_empty() {
                message.push_str(". ");
                message.push_str(&suggest::did_you_mean(&suggestions));
            }
            CompileError::Configuration {
                message,
                location: Some(location),
                suggestions,
            }
        }
        other => CompileError::Schema {
            kind: SchemaErrorKind::InvalidField,
            field_path,
            location,
            message: other.to_string(),
        },
    })
}

/// Validate the mapping against the embedded JSON schema.
///
/// Reports the first error, positioned at the offending key.
pub(crate) fn validate(mapping: &Mapping, locator: &FieldLocator<'_>) -> Result<()> {
    let instance = serde_json::to_value(Value::Mapping(mapping.clone())).map_err(|e| {
        CompileError::Schema {
            kind: SchemaErrorKind::InvalidField,
            field_path: "/".to_string(),
            location: locator.locate(&[]),
            message: format!("frontmatter cannot be represented as JSON: {}", e),
        }
    })?;

    let validator = validator()?;
    let first = validator.iter_errors(&instance).next().map(|error| {
        let path = error.instance_path.to_string();
        let path = if path.is_empty() { "/".to_string() } else { path };
        (path, error.to_string())
    });

    match first {
        None => Ok(()),
        Some((field_path, message)) => Err(CompileError::Schema {
            kind: SchemaErrorKind::InvalidField,
            location: locator.locate_pointer(&field_path),
            field_path,
            message,
        }),
    }
}
