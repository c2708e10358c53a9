//! Error types for the awc compiler.
//!
//! Uses thiserror for derive macros. Errors that originate from a specific
//! place in a source document carry a [`SourceLocation`] so the CLI can
//! render them as positioned diagnostics (see [`crate::diagnostic`]).

use crate::exit_codes;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A position inside a source document (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(path: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            path: path.into(),
            line: line.max(1),
            column: column.max(1),
        }
    }

    /// Location pointing at the first character of a file.
    pub fn start_of(path: impl Into<PathBuf>) -> Self {
        Self::new(path, 1, 1)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path.display(), self.line, self.column)
    }
}

/// Classification of structural parse failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The frontmatter block is not validly delimited or is not valid YAML.
    MalformedFrontmatter,
    /// An `imports` entry points at a document that does not exist.
    MissingImport,
}

/// Classification of schema failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// A recognized field has the wrong shape or value.
    InvalidField,
    /// A field is not recognized at all.
    UnknownField,
}

/// Main error type for compiler operations.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Malformed document structure.
    #[error("{location}: {message}")]
    Parse {
        kind: ParseErrorKind,
        location: SourceLocation,
        message: String,
    },

    /// A field is present but has an invalid shape or value.
    #[error("{location}: invalid field '{field_path}': {message}")]
    Schema {
        kind: SchemaErrorKind,
        field_path: String,
        location: SourceLocation,
        message: String,
    },

    /// The import graph contains a cycle.
    #[error("{location}: import cycle detected: {}", format_cycle(.cycle))]
    Cycle {
        cycle: Vec<PathBuf>,
        /// The `imports` key that closes the cycle.
        location: SourceLocation,
    },

    /// A fragment declares a field that only a top-level workflow may declare.
    #[error(
        "{}: field '{field}' is not allowed in imported fragment '{}'; it may only appear in a top-level workflow",
        .location,
        .fragment.display()
    )]
    ForbiddenField {
        field: String,
        fragment: PathBuf,
        location: SourceLocation,
    },

    /// Cross-field inconsistency (unknown engine, invalid permission scope, ...).
    #[error("{}{message}", format_location_prefix(.location))]
    Configuration {
        message: String,
        location: Option<SourceLocation>,
        suggestions: Vec<String>,
    },

    /// The generated output could not be written.
    #[error("failed to write '{}': {source}", .path.display())]
    Emission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source document could not be read.
    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    /// Build a configuration error without a source position.
    pub fn configuration(message: impl Into<String>) -> Self {
        CompileError::Configuration {
            message: message.into(),
            location: None,
            suggestions: Vec::new(),
        }
    }

    /// Attach a location to a configuration error that has none yet.
    pub fn with_location(self, location: SourceLocation) -> Self {
        match self {
            CompileError::Configuration {
                message,
                location: None,
                suggestions,
            } => CompileError::Configuration {
                message,
                location: Some(location),
                suggestions,
            },
            other => other,
        }
    }

    /// The source position this error points at, if any.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            CompileError::Parse { location, .. }
            | CompileError::Schema { location, .. }
            | CompileError::Cycle { location, .. }
            | CompileError::ForbiddenField { location, .. } => Some(location),
            CompileError::Configuration { location, .. } => location.as_ref(),
            CompileError::Emission { .. } | CompileError::Io { .. } => None,
        }
    }

    /// Near-miss suggestions carried by the error (engine names, field names).
    pub fn suggestions(&self) -> &[String] {
        match self {
            CompileError::Configuration { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::Io { .. } => exit_codes::USER_ERROR,
            CompileError::Emission { .. } => exit_codes::EMISSION_FAILURE,
            _ => exit_codes::COMPILE_FAILURE,
        }
    }
}

fn format_cycle(cycle: &[PathBuf]) -> String {
    cycle
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" → ")
}

fn format_location_prefix(location: &Option<SourceLocation>) -> String {
    match location {
        Some(loc) => format!("{}: ", loc),
        None => String::new(),
    }
}

/// Result type alias for compiler operations.
pub type Result<T> = std::result::Result<T, CompileError>;
