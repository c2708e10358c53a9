//! Fields only a top-level workflow may declare.

use crate::error::{CompileError, Result};
use crate::frontmatter::WorkflowDocument;

/// Fields rejected in imported fragments.
pub const FORBIDDEN_FRAGMENT_FIELDS: &[&str] = &[
    "on",
    "run-name",
    "runs-on",
    "concurrency",
    "if",
    "timeout-minutes",
    "container",
    "environment",
    "sandbox",
    "features",
    "roles",
    "github-token",
    "strict",
    "tracker-id",
];

pub fn is_forbidden(field: &str) -> bool {
    FORBIDDEN_FRAGMENT_FIELDS.contains(&field)
}

/// Reject the first forbidden field a fragment declares.
pub fn check_fragment(fragment: &WorkflowDocument) -> Result<()> {
    match fragment
        .declared_fields()
        .iter()
        .find(|field| is_forbidden(field))
    {
        Some(field) => Err(CompileError::ForbiddenField {
            field: field.clone(),
            fragment: fragment.source_path.clone(),
            location: fragment.field_location(&[field.as_str()]),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_with_trigger_is_rejected() {
        let doc = WorkflowDocument::parse("---\ntools:\n  bash: [ls]\non: push\n---\n", "shared/a.md")
            .unwrap();
        match check_fragment(&doc).unwrap_err() {
            CompileError::ForbiddenField {
                field,
                fragment,
                location,
            } => {
                assert_eq!(field, "on");
                assert_eq!(fragment.to_str(), Some("shared/a.md"));
                assert_eq!(location.line, 4);
            }
            other => panic!("expected forbidden field error, got {:?}", other),
        }
    }

    #[test]
    fn mergeable_fields_are_allowed() {
        let doc = WorkflowDocument::parse(
            "---\npermissions:\n  issues: read\ntools:\n  bash: [ls]\nnetwork: defaults\n---\n",
            "shared/a.md",
        )
        .unwrap();
        assert!(check_fragment(&doc).is_ok());
    }

    #[test]
    fn forbidden_set_is_complete() {
        for field in ["on", "strict", "tracker-id", "github-token", "roles"] {
            assert!(is_forbidden(field));
        }
        for field in ["tools", "permissions", "engine", "imports", "safe-outputs"] {
            assert!(!is_forbidden(field));
        }
    }
}
