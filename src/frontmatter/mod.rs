//! Workflow document parsing.
//!
//! A workflow document is markdown with an optional YAML frontmatter block:
//!
//! ```text
//! ---
//! on: issues
//! permissions:
//!   issues: read
//! engine: claude
//! ---
//!
//! # Triage
//! Label the new issue.
//! ```
//!
//! The frontmatter is validated (unknown fields, permissions, JSON schema)
//! and deserialized into a typed [`Frontmatter`]. The body is kept
//! byte-for-byte, including its original line endings.

mod fields;
mod locate;
mod schema;


pub use fields::{
    EngineConfig, FRONTMATTER_FIELDS, Frontmatter, IGNORED_FRONTMATTER_FIELDS, ImportSpec,
    NetworkPolicy, Roles,
};
pub use locate::FieldLocator;

use crate::error::{CompileError, ParseErrorKind, Result, SchemaErrorKind, SourceLocation};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

/// Options controlling how strictly a document is checked.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Run the JSON schema pass. Unknown-field and permission checks always run.
    pub validate_schema: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            validate_schema: true,
        }
    }
}

/// One parsed markdown file.
#[derive(Debug, Clone)]
pub struct WorkflowDocument {
    pub source_path: PathBuf,
    pub frontmatter: Frontmatter,
    /// Markdown after the closing delimiter, byte-exact.
    pub body: String,
    raw_frontmatter: String,
    declared: Vec<String>,
    frontmatter_line: usize,
    body_line: usize,
}

impl WorkflowDocument {
    /// Parse a document with default options.
    pub fn parse(content: &str, source_path: impl Into<PathBuf>) -> Result<Self> {
        Self::parse_with(content, source_path, ParseOptions::default())
    }

    /// Parse a document.
    ///
    /// Both LF and CRLF line endings are accepted. A document that does not
    /// start with `---` has no frontmatter; its whole text is the body.
    pub fn parse_with(
        content: &str,
        source_path: impl Into<PathBuf>,
        options: ParseOptions,
    ) -> Result<Self> {
        let source_path = source_path.into();
        let normalized = content.replace("\r\n", "\n");

        let Some(split) = split_frontmatter(&normalized, &source_path)? else {
            return Ok(Self {
                source_path,
                frontmatter: Frontmatter::default(),
                body: content.to_string(),
                raw_frontmatter: String::new(),
                declared: Vec::new(),
                frontmatter_line: 1,
                body_line: 1,
            });
        };

        let body_start = find_original_position(content, split.body_offset);
        let body = content[body_start..].to_string();
        let raw_frontmatter = normalized[split.yaml_range.clone()].to_string();
        let locator = FieldLocator::new(&source_path, &raw_frontmatter, FRONTMATTER_FIRST_LINE);

        let mut mapping = parse_mapping(&raw_frontmatter, &locator)?;
        schema::check_fields(&mut mapping, &locator)?;
        schema::check_permissions(&mapping, &locator)?;
        if options.validate_schema {
            schema::validate(&mapping, &locator)?;
        }

        let declared = mapping
            .keys()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect();

        let frontmatter: Frontmatter =
            serde_yaml::from_value(Value::Mapping(mapping)).map_err(|e| CompileError::Schema {
                kind: SchemaErrorKind::InvalidField,
                field_path: "/".to_string(),
                location: locator.locate(&[]),
                message: e.to_string(),
            })?;

        Ok(Self {
            source_path,
            frontmatter,
            body,
            raw_frontmatter,
            declared,
            frontmatter_line: FRONTMATTER_FIRST_LINE,
            body_line: 1 + normalized[..split.body_offset].matches('\n').count(),
        })
    }

    /// Top-level fields written in this document, in source order.
    pub fn declared_fields(&self) -> &[String] {
        &self.declared
    }

    pub fn declares(&self, field: &str) -> bool {
        self.declared.iter().any(|f| f == field)
    }

    pub fn has_frontmatter(&self) -> bool {
        self.body_line > 1
    }

    /// Line of the document on which the body starts.
    pub fn body_line(&self) -> usize {
        self.body_line
    }

    /// Locator for positions inside this document's frontmatter.
    pub fn locator(&self) -> FieldLocator<'_> {
        FieldLocator::new(&self.source_path, &self.raw_frontmatter, self.frontmatter_line)
    }

    /// Position of a frontmatter field such as `["engine", "id"]`.
    pub fn field_location(&self, segments: &[&str]) -> SourceLocation {
        if !self.has_frontmatter() {
            return SourceLocation::start_of(&self.source_path);
        }
        self.locator().locate(segments)
    }

    /// Workflow name: the `name` field, then the first `# ` heading, then the
    /// file stem.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.frontmatter.name {
            return name.clone();
        }
        if let Some(heading) = first_heading(&self.body) {
            return heading;
        }
        self.stem()
    }

    /// File name without extensions (`triage.md` → `triage`).
    pub fn stem(&self) -> String {
        workflow_stem(&self.source_path)
    }
}

/// Stem of a workflow path, used as its identifier.
pub fn workflow_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workflow".to_string())
}

/// The YAML inside a `---` block always starts on the second line.
const FRONTMATTER_FIRST_LINE: usize = 2;

struct FrontmatterSplit {
    /// Byte range of the YAML text in the normalized content.
    yaml_range: std::ops::Range<usize>,
    /// Byte offset of the body in the normalized content.
    body_offset: usize,
}

fn split_frontmatter(normalized: &str, path: &Path) -> Result<Option<FrontmatterSplit>> {
    let opening = match normalized.split_inclusive('\n').next() {
        Some(line) if line.trim_end() == "---" => line.len(),
        _ => return Ok(None),
    };

    let mut offset = opening;
    for line in normalized[opening..].split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Ok(Some(FrontmatterSplit {
                yaml_range: opening..offset,
                body_offset: offset + line.len(),
            }));
        }
        offset += line.len();
    }

    Err(CompileError::Parse {
        kind: ParseErrorKind::MalformedFrontmatter,
        location: SourceLocation::start_of(path),
        message: "frontmatter is missing its closing '---' delimiter".to_string(),
    })
}

fn parse_mapping(raw: &str, locator: &FieldLocator<'_>) -> Result<Mapping> {
    let value: Value = serde_yaml::from_str(raw).map_err(|e| {
        let location = match e.location() {
            Some(loc) => locator.offset(loc.line(), loc.column()),
            None => locator.locate(&[]),
        };
        CompileError::Parse {
            kind: ParseErrorKind::MalformedFrontmatter,
            location,
            message: format!("invalid frontmatter YAML: {}", e),
        }
    })?;

    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(mapping) => Ok(mapping),
        _ => Err(CompileError::Parse {
            kind: ParseErrorKind::MalformedFrontmatter,
            location: locator.locate(&[]),
            message: "frontmatter must be a YAML mapping".to_string(),
        }),
    }
}

/// Map an offset in LF-normalized content back to the original content.
fn find_original_position(original: &str, normalized_pos: usize) -> usize {
    let bytes = original.as_bytes();
    let mut orig_pos = 0;
    let mut norm_pos = 0;

    while norm_pos < normalized_pos && orig_pos < bytes.len() {
        if bytes[orig_pos] == b'\r' && bytes.get(orig_pos + 1) == Some(&b'\n') {
            orig_pos += 2;
        } else {
            orig_pos += 1;
        }
        norm_pos += 1;
    }

    orig_pos
}

fn first_heading(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}
