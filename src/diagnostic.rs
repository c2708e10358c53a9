//! Compiler-style rendering of errors.
//!
//! ```text
//! .github/workflows/triage.md:3:9: error: unknown engine 'claud'. Did you mean 'claude'?
//!   3 | engine: claud
//!     |         ^
//! ```

use crate::error::{CompileError, SourceLocation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Option<SourceLocation>,
    pub message: String,
}

impl Diagnostic {
    pub fn from_error(err: &CompileError) -> Self {
        let location = err.location().cloned();
        let text = err.to_string();
        // Positioned variants already lead with the location; drop it here.
        let message = match &location {
            Some(loc) => text
                .strip_prefix(&format!("{}: ", loc))
                .map(str::to_string)
                .unwrap_or(text),
            None => text,
        };
        Self { location, message }
    }

    /// Render the diagnostic. With `source` (the text of the file the
    /// location points into) the offending line and a caret follow.
    pub fn render(&self, source: Option<&str>) -> String {
        let Some(location) = &self.location else {
            return format!("error: {}\n", self.message);
        };

        let mut out = format!("{}: error: {}\n", location, self.message);
        let Some(line) = source.and_then(|text| text.lines().nth(location.line - 1)) else {
            return out;
        };

        let number = location.line.to_string();
        let gutter = " ".repeat(number.len());
        // Keep tabs so the caret lines up with the source line.
        let pad: String = line
            .chars()
            .take(location.column - 1)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        out.push_str(&format!("  {} | {}\n", number, line));
        out.push_str(&format!("  {} | {}^\n", gutter, pad));
        out
    }
}

/// Render `err`, reading the located file through `load` for context.
pub fn render_error<F>(err: &CompileError, load: F) -> String
where
    F: FnOnce(&std::path::Path) -> Option<String>,
{
    let diagnostic = Diagnostic::from_error(err);
    let source = diagnostic
        .location
        .as_ref()
        .and_then(|location| load(&location.path));
    diagnostic.render(source.as_deref())
}
