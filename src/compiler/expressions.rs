//! GitHub expressions in the prompt body.
//!
//! The prompt is written to disk by a shell step, so `${{ ... }}` cannot be
//! left in it verbatim: the runner would splice untrusted event text into
//! the script. Each expression is replaced by a `${GH_AW_EXPR_<hash>}`
//! placeholder and passed through the step env instead; `envsubst` fills the
//! placeholders at run time.
//!
//! # Syntax
//!
//! - `${{ expr }}` - an expression; `expr` must match the allow-list
//! - anything else is copied unchanged

use crate::error::{CompileError, Result};
use std::collections::BTreeMap;
use xxhash_rust::xxh3::xxh3_64;

/// Exact expressions the prompt may use.
const ALLOWED_EXACT: &[&str] = &[
    "github.actor",
    "github.event.after",
    "github.event.before",
    "github.event.comment.id",
    "github.event.discussion.number",
    "github.event.issue.number",
    "github.event.pull_request.number",
    "github.event.release.tag_name",
    "github.job",
    "github.owner",
    "github.ref",
    "github.ref_name",
    "github.repository",
    "github.run_attempt",
    "github.run_id",
    "github.run_number",
    "github.server_url",
    "github.sha",
    "github.workflow",
    "github.workspace",
];

/// Expression prefixes the prompt may use.
const ALLOWED_PREFIXES: &[&str] = &["env.", "inputs.", "needs.", "steps.", "github.event.inputs."];

/// A prompt with its expressions replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptExpressions {
    pub text: String,
    /// Placeholder env var → original expression, sorted by name.
    pub placeholders: BTreeMap<String, String>,
}

impl PromptExpressions {
    pub fn is_empty(&self) -> bool {
        self.placeholders.is_empty()
    }

    /// Step env entries mapping each placeholder to its expression.
    pub fn env(&self) -> BTreeMap<String, String> {
        self.placeholders
            .iter()
            .map(|(name, expr)| (name.clone(), format!("${{{{ {} }}}}", expr)))
            .collect()
    }

    /// The `envsubst` variable list restricting substitution to placeholders.
    pub fn envsubst_filter(&self) -> String {
        self.placeholders
            .keys()
            .map(|name| format!("${{{}}}", name))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Placeholder variable name for one expression.
pub fn placeholder_name(expression: &str) -> String {
    format!("GH_AW_EXPR_{:016X}", xxh3_64(expression.as_bytes()))
}

/// Whether an expression may appear in a prompt.
pub fn is_allowed(expression: &str) -> bool {
    ALLOWED_EXACT.contains(&expression)
        || ALLOWED_PREFIXES
            .iter()
            .any(|prefix| expression.starts_with(prefix) && expression.len() > prefix.len())
}

/// Replace every `${{ ... }}` in `body` with a placeholder.
///
/// # Errors
///
/// - An expression reads `secrets`
/// - An expression is outside the allow-list
/// - A `${{` has no closing `}}`
pub fn extract(body: &str) -> Result<PromptExpressions> {
    let mut result = PromptExpressions {
        text: String::with_capacity(body.len()),
        placeholders: BTreeMap::new(),
    };
    let mut rest = body;

    while let Some(start) = rest.find("${{") {
        result.text.push_str(&rest[..start]);
        let after_open = &rest[start + 3..];
        let Some(end) = after_open.find("}}") else {
            return Err(CompileError::configuration(
                "unterminated '${{' expression in the prompt body",
            ));
        };

        let expression = after_open[..end].trim();
        check_expression(expression)?;

        let name = placeholder_name(expression);
        result.text.push_str(&format!("${{{}}}", name));
        result
            .placeholders
            .insert(name, expression.to_string());
        rest = &after_open[end + 2..];
    }
    result.text.push_str(rest);

    Ok(result)
}

fn check_expression(expression: &str) -> Result<()> {
    if expression.is_empty() {
        return Err(CompileError::configuration(
            "empty '${{ }}' expression in the prompt body",
        ));
    }
    if expression.contains("secrets.") {
        return Err(CompileError::configuration(format!(
            "the prompt body may not read secrets: '${{{{ {} }}}}'",
            expression
        )));
    }
    if !is_allowed(expression) {
        return Err(CompileError::configuration(format!(
            "expression '${{{{ {} }}}}' is not allowed in the prompt body; allowed are {} and expressions starting with {}",
            expression,
            ALLOWED_EXACT.join(", "),
            ALLOWED_PREFIXES.join(", ")
        )));
    }
    Ok(())
}
