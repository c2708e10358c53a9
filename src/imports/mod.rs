//! Import resolution.
//!
//! Expands a workflow's `imports` list into an [`ImportGraph`]: every
//! fragment reachable from the root, the edges between them, and the order in
//! which their configuration is merged (depth-first post-order, first
//! occurrence wins for diamonds).
//!
//! Paths resolve relative to the importing document's directory. A path that
//! starts with `/` resolves from the import root instead.

mod body;
mod forbidden;
mod loader;

#[cfg(test)]
mod tests;

pub use body::{compose_prompt, extract_section};
pub use forbidden::{FORBIDDEN_FRAGMENT_FIELDS, check_fragment, is_forbidden};
pub use loader::{FsLoader, SourceLoader, VirtualLoader, normalize_path};

use crate::error::{CompileError, ParseErrorKind, Result};
use crate::frontmatter::{ImportSpec, ParseOptions, WorkflowDocument};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// One imported fragment.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Normalized path used to load the fragment.
    pub path: PathBuf,
    /// Path relative to the import root, with `/` separators.
    pub display_path: String,
    pub document: WorkflowDocument,
    /// Section selected by the first import that reached this fragment.
    pub section: Option<String>,
    /// The body text that contributes to the prompt (section applied).
    pub body: String,
}

/// Resolved imports of one root document.
#[derive(Debug, Clone, Default)]
pub struct ImportGraph {
    root: PathBuf,
    fragments: BTreeMap<PathBuf, Fragment>,
    order: Vec<PathBuf>,
    edges: Vec<(PathBuf, PathBuf)>,
}

impl ImportGraph {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fragment paths in merge order.
    pub fn merge_order(&self) -> &[PathBuf] {
        &self.order
    }

    /// Fragments in merge order.
    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.order.iter().filter_map(|path| self.fragments.get(path))
    }

    /// Declared `importer → imported` edges, in traversal order.
    pub fn edges(&self) -> &[(PathBuf, PathBuf)] {
        &self.edges
    }

    pub fn get(&self, path: &Path) -> Option<&Fragment> {
        self.fragments.get(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Loads and checks the fragments reachable from a root document.
pub struct ImportResolver<'a> {
    loader: &'a dyn SourceLoader,
    import_root: PathBuf,
    parse_options: ParseOptions,
}

impl<'a> ImportResolver<'a> {
    pub fn new(loader: &'a dyn SourceLoader, import_root: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            import_root: normalize_path(&import_root.into()),
            parse_options: ParseOptions::default(),
        }
    }

    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse_options = options;
        self
    }

    /// Resolve the full import graph of `root`.
    pub fn resolve(&self, root: &WorkflowDocument) -> Result<ImportGraph> {
        let root_path = normalize_path(&root.source_path);
        let mut graph = ImportGraph {
            root: root_path.clone(),
            ..ImportGraph::default()
        };
        let mut stack = vec![root_path];

        self.visit(root, &mut stack, &mut graph)?;

        tracing::debug!(
            root = %graph.root.display(),
            fragments = graph.len(),
            "resolved imports"
        );
        Ok(graph)
    }

    fn visit(
        &self,
        importer: &WorkflowDocument,
        stack: &mut Vec<PathBuf>,
        graph: &mut ImportGraph,
    ) -> Result<()> {
        let importer_path = normalize_path(&importer.source_path);

        for spec in &importer.frontmatter.imports {
            let path = self.resolve_path(&importer_path, &spec.path);
            graph.edges.push((importer_path.clone(), path.clone()));

            if let Some(start) = stack.iter().position(|p| *p == path) {
                let mut cycle: Vec<PathBuf> = stack[start..]
                    .iter()
                    .map(|p| self.relative(p))
                    .collect();
                cycle.push(self.relative(&path));
                return Err(CompileError::Cycle {
                    cycle,
                    location: importer.field_location(&["imports"]),
                });
            }
            if graph.fragments.contains_key(&path) {
                continue;
            }

            let document = self.load(importer, spec, &path)?;
            check_fragment(&document)?;
            let body = self.fragment_body(importer, spec, &document)?;

            stack.push(path.clone());
            self.visit(&document, stack, graph)?;
            stack.pop();

            let fragment = Fragment {
                display_path: display_path(&self.relative(&path)),
                path: path.clone(),
                document,
                section: spec.section.clone(),
                body,
            };
            graph.order.push(path.clone());
            graph.fragments.insert(path, fragment);
        }
        Ok(())
    }

    fn resolve_path(&self, importer: &Path, target: &str) -> PathBuf {
        let joined = match target.strip_prefix('/') {
            Some(from_root) => self.import_root.join(from_root),
            None => importer
                .parent()
                .map(|dir| dir.join(target))
                .unwrap_or_else(|| PathBuf::from(target)),
        };
        normalize_path(&joined)
    }

    fn load(
        &self,
        importer: &WorkflowDocument,
        spec: &ImportSpec,
        path: &Path,
    ) -> Result<WorkflowDocument> {
        tracing::debug!(path = %path.display(), "loading import");
        let content = self.loader.load(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                CompileError::Parse {
                    kind: ParseErrorKind::MissingImport,
                    location: importer.field_location(&["imports"]),
                    message: format!(
                        "imported file '{}' not found (resolved to '{}')",
                        spec.path,
                        path.display()
                    ),
                }
            } else {
                CompileError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        WorkflowDocument::parse_with(&content, path, self.parse_options)
    }

    fn fragment_body(
        &self,
        importer: &WorkflowDocument,
        spec: &ImportSpec,
        document: &WorkflowDocument,
    ) -> Result<String> {
        let Some(section) = &spec.section else {
            return Ok(document.body.clone());
        };
        extract_section(&document.body, section).ok_or_else(|| CompileError::Configuration {
            message: format!("section '{}' not found in '{}'", section, spec.path),
            location: Some(importer.field_location(&["imports"])),
            suggestions: Vec::new(),
        })
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.import_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    }
}

fn display_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
