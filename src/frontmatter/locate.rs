//! Mapping field paths back to positions in the frontmatter text.
//!
//! Parsing goes through `serde_yaml::Value`, which keeps no spans. Positions
//! for diagnostics are recovered by scanning the raw text for the key lines
//! of a path, walking deeper one indentation level per segment.

use crate::error::SourceLocation;
use std::path::Path;

/// Locates keys inside one document's frontmatter block.
#[derive(Debug, Clone, Copy)]
pub struct FieldLocator<'a> {
    path: &'a Path,
    raw: &'a str,
    /// Document line number of the first frontmatter line.
    first_line: usize,
}

impl<'a> FieldLocator<'a> {
    pub fn new(path: &'a Path, raw: &'a str, first_line: usize) -> Self {
        Self {
            path,
            raw,
            first_line,
        }
    }

    /// Position of the deepest key of `segments` that can be found.
    ///
    /// Numeric segments (sequence indices) are skipped. Falls back to the
    /// first frontmatter line when even the top-level key is absent.
    pub fn locate(&self, segments: &[&str]) -> SourceLocation {
        let lines: Vec<&str> = self.raw.lines().collect();
        let mut best = None;
        let mut start = 0;
        let mut parent_indent: Option<usize> = None;

        for segment in segments.iter().filter(|s| s.parse::<usize>().is_err()) {
            match find_key(&lines, start, parent_indent, segment) {
                Some((index, indent)) => {
                    best = Some((index, indent));
                    start = index + 1;
                    parent_indent = Some(indent);
                }
                None => break,
            }
        }

        match best {
            Some((index, indent)) => {
                SourceLocation::new(self.path, self.first_line + index, indent + 1)
            }
            None => SourceLocation::new(self.path, self.first_line, 1),
        }
    }

    /// Position of a `/`-separated field path such as `/engine/max-turns`.
    pub fn locate_pointer(&self, pointer: &str) -> SourceLocation {
        let segments: Vec<&str> = pointer.split('/').filter(|s| !s.is_empty()).collect();
        self.locate(&segments)
    }

    /// Translate a position reported relative to the frontmatter block.
    pub fn offset(&self, line: usize, column: usize) -> SourceLocation {
        SourceLocation::new(self.path, self.first_line + line.saturating_sub(1), column)
    }
}

fn find_key(
    lines: &[&str],
    start: usize,
    parent_indent: Option<usize>,
    key: &str,
) -> Option<(usize, usize)> {
    for (index, line) in lines.iter().enumerate().skip(start) {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.len() - trimmed.len();
        if parent_indent.is_none() && indent > 0 {
            continue;
        }

        if let Some(parent) = parent_indent
            && indent <= parent
            && !trimmed.starts_with("- ")
        {
            return None;
        }

        let candidate = trimmed.strip_prefix("- ").unwrap_or(trimmed);
        let offset = trimmed.len() - candidate.len();
        if declares_key(candidate, key) {
            return Some((index, indent + offset));
        }
    }
    None
}

fn declares_key(line: &str, key: &str) -> bool {
    [
        format!("{}:", key),
        format!("\"{}\":", key),
        format!("'{}':", key),
    ]
    .iter()
    .any(|prefix| line.starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "name: demo\nengine:\n  id: claude\n  max-turns: zero\nsteps:\n  - name: a\n    run: echo\n";

    #[test]
    fn locates_top_level_key() {
        let locator = FieldLocator::new(Path::new("wf.md"), RAW, 2);
        let loc = locator.locate(&["engine"]);
        assert_eq!((loc.line, loc.column), (3, 1));
    }

    #[test]
    fn locates_nested_key() {
        let locator = FieldLocator::new(Path::new("wf.md"), RAW, 2);
        let loc = locator.locate_pointer("/engine/max-turns");
        assert_eq!((loc.line, loc.column), (5, 3));
    }

    #[test]
    fn locates_key_inside_sequence_item() {
        let locator = FieldLocator::new(Path::new("wf.md"), RAW, 2);
        let loc = locator.locate_pointer("/steps/0/run");
        assert_eq!((loc.line, loc.column), (8, 5));
    }

    #[test]
    fn missing_nested_key_falls_back_to_parent() {
        let locator = FieldLocator::new(Path::new("wf.md"), RAW, 2);
        let loc = locator.locate_pointer("/engine/model");
        assert_eq!((loc.line, loc.column), (3, 1));
    }

    #[test]
    fn missing_key_falls_back_to_block_start() {
        let locator = FieldLocator::new(Path::new("wf.md"), RAW, 2);
        let loc = locator.locate(&["tools"]);
        assert_eq!((loc.line, loc.column), (2, 1));
    }
}
