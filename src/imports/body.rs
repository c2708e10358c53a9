//! Prompt body composition across imports.

use super::ImportGraph;
use crate::frontmatter::WorkflowDocument;

/// Compose the agent prompt: fragment bodies in merge order, root body last.
///
/// With `inline` the fragment text is copied in. Otherwise each fragment is
/// referenced by a `{{#runtime-import ...}}` macro expanded when the
/// workflow runs, so edits to shared fragments do not require a recompile.
/// Fragments with an empty body contribute configuration only and are skipped.
pub fn compose_prompt(graph: &ImportGraph, root: &WorkflowDocument, inline: bool) -> String {
    let mut parts: Vec<String> = Vec::new();

    for fragment in graph.fragments() {
        if fragment.body.trim().is_empty() {
            continue;
        }
        if inline {
            parts.push(fragment.body.trim_matches('\n').to_string());
        } else {
            let target = match &fragment.section {
                Some(section) => format!("{}#{}", fragment.display_path, section),
                None => fragment.display_path.clone(),
            };
            parts.push(format!("{{{{#runtime-import {}}}}}", target));
        }
    }

    let root_body = root.body.trim_matches('\n');
    if !root_body.is_empty() {
        parts.push(root_body.to_string());
    }

    let mut prompt = parts.join("\n\n");
    prompt.push('\n');
    prompt
}

/// Extract a `##` section (heading included) from a markdown body.
///
/// The heading match ignores case and surrounding whitespace. The section
/// ends at the next heading of level one or two.
pub fn extract_section(body: &str, name: &str) -> Option<String> {
    let wanted = name.trim().to_lowercase();
    let mut lines = body.lines();
    let mut section = Vec::new();

    for line in lines.by_ref() {
        if let Some(title) = line.trim_start().strip_prefix("## ")
            && title.trim().to_lowercase() == wanted
        {
            section.push(line);
            break;
        }
    }
    if section.is_empty() {
        return None;
    }

    for line in lines {
        let trimmed = line.trim_start();
        if trimmed.starts_with("# ") || trimmed.starts_with("## ") {
            break;
        }
        section.push(line);
    }

    let mut text = section.join("\n").trim_end().to_string();
    text.push('\n');
    Some(text)
}
