//! The compile pipeline.
//!
//! One document moves through `Parsed → Imported → Merged → EngineSelected →
//! SafeOutputsWired → Emitted`, strictly in order. A [`Compiler`] holds only
//! shared immutable state (the engine registry and options), so one instance
//! can serve many documents concurrently.

mod build;
pub mod expressions;
pub mod schedule;
pub mod stop_time;


pub use build::{ACTIVATION_JOB, AGENT_JOB};

use crate::emitter::{self, Header};
use crate::engine::{self, EngineRegistry, ToolSet, mcp, network};
use crate::error::{CompileError, Result, SourceLocation};
use crate::frontmatter::{ParseOptions, WorkflowDocument};
use crate::fs::atomic_write_file;
use crate::imports::{self, FsLoader, ImportGraph, ImportResolver, SourceLoader};
use crate::merge;
use crate::permissions::{PermissionLevel, PermissionScope, Permissions};
use crate::safe_outputs::SafeOutputs;
use build::WorkflowPlan;
use chrono::{DateTime, Utc};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Settings shared by every document of one compile run.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Produce the YAML but do not write the lock file.
    pub no_emit: bool,
    /// Skip the JSON schema pass.
    pub skip_validation: bool,
    /// Seed for fuzzy schedules; defaults to the file stem.
    pub workflow_id: Option<String>,
    /// Copy fragment bodies into the prompt instead of runtime imports.
    pub inline_prompt: bool,
    pub strict: bool,
    /// Engine id taking precedence over the frontmatter.
    pub engine_override: Option<String>,
    /// Engine used when neither the override nor the frontmatter names one.
    pub default_engine: Option<String>,
    /// Repository every safe output targets (`owner/repo`).
    pub trial_repo: Option<String>,
    /// Recompute relative stop times instead of reusing the previous ones.
    pub refresh_stop_time: bool,
    /// Clock used for stop times; `None` reads the system clock.
    pub now: Option<DateTime<Utc>>,
    /// Directory that `/`-prefixed imports resolve against.
    pub import_root: Option<PathBuf>,
}

/// Result of compiling one file.
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub source: PathBuf,
    pub lock_path: PathBuf,
    pub yaml: String,
    /// The lock file was written (false with `no_emit`).
    pub written: bool,
}

/// Path of the lock file generated for `source` (`triage.md` → `triage.lock.yml`).
pub fn lock_path(source: &Path) -> PathBuf {
    let stem = crate::frontmatter::workflow_stem(source);
    source.with_file_name(format!("{}.lock.yml", stem))
}

pub struct Compiler<'r> {
    registry: &'r EngineRegistry,
    options: CompileOptions,
    loader: Box<dyn SourceLoader>,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r EngineRegistry, options: CompileOptions) -> Self {
        Self {
            registry,
            options,
            loader: Box::new(FsLoader),
        }
    }

    /// Read sources (the root document, imports and the previous lock file)
    /// through `loader` instead of the filesystem.
    pub fn with_loader(mut self, loader: impl SourceLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn registry(&self) -> &EngineRegistry {
        self.registry
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            validate_schema: !self.options.skip_validation,
        }
    }

    pub fn parse_workflow_string(
        &self,
        content: &str,
        filename: impl Into<PathBuf>,
    ) -> Result<WorkflowDocument> {
        WorkflowDocument::parse_with(content, filename, self.parse_options())
    }

    /// Run every stage after parsing and return the lock file text.
    pub fn compile_to_yaml(&self, document: &WorkflowDocument) -> Result<String> {
        let path = document.source_path.display().to_string();
        tracing::debug!(path = %path, "compiling workflow");

        let import_root = self
            .options
            .import_root
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let graph = ImportResolver::new(self.loader.as_ref(), &import_root)
            .with_parse_options(self.parse_options())
            .resolve(document)?;
        tracing::debug!(path = %path, fragments = graph.len(), "imported");

        let merged = merge::merge_graph(&document.frontmatter, &graph);
        tracing::debug!(path = %path, "merged");
        let locate = |segments: &[&str]| locate_field(document, &graph, segments);

        let Some(mut on) = merged.on.clone() else {
            return Err(CompileError::configuration(
                "missing 'on': a workflow must declare its triggers",
            )
            .with_location(SourceLocation::start_of(&document.source_path)));
        };

        let selection = engine::resolve_selection(
            self.registry,
            merged.engine.as_ref(),
            self.options.engine_override.as_deref(),
            self.options.default_engine.as_deref(),
        )
        .map_err(|err| match self.options.engine_override {
            Some(_) => err,
            None => err.with_location(locate(&["engine"])),
        })?;
        let adapter = self.registry.get(selection.id.as_str())?;
        adapter
            .validate(&selection)
            .map_err(|err| err.with_location(locate(&["engine"])))?;
        tracing::debug!(
            path = %path,
            engine = %selection.id,
            source = ?selection.source,
            "engine selected"
        );

        let tools = ToolSet::from_map(&merged.tools).map_err(|err| err.with_location(locate(&["tools"])))?;
        let safe_outputs = SafeOutputs::parse(&merged.safe_outputs, locate)?;
        safe_outputs
            .check_write_tools(&tools)
            .map_err(|err| err.with_location(locate(&["tools"])))?;
        let mcp_servers = mcp::collect_servers(&tools, &merged.mcp_servers, !safe_outputs.is_empty())
            .map_err(|err| err.with_location(locate(&["mcp-servers"])))?;
        let allowed_domains =
            network::expand_allowed(merged.network.as_ref().map(|policy| policy.allowed.as_slice()));

        for body in std::iter::once(document.body.as_str())
            .chain(graph.fragments().map(|fragment| fragment.body.as_str()))
        {
            safe_outputs
                .check_body_references(body)
                .map_err(|err| err.with_location(locate(&["safe-outputs"])))?;
        }
        let prompt_text = imports::compose_prompt(&graph, document, self.options.inline_prompt);
        let prompt = expressions::extract(&prompt_text)
            .map_err(|err| err.with_location(body_location(document)))?;
        let runtime_imports =
            !self.options.inline_prompt && graph.fragments().any(|f| !f.body.trim().is_empty());

        let permissions = merged.permissions.clone().unwrap_or_else(|| {
            Permissions::explicit([(PermissionScope::Contents, PermissionLevel::Read)])
        });
        if self.options.strict || merged.strict == Some(true) {
            check_strict(&permissions).map_err(|err| err.with_location(locate(&["permissions"])))?;
        }

        let stop_time = self
            .stop_time(document, &mut on)
            .map_err(|err| err.with_location(locate(&["on", "stop-after"])))?;
        let workflow_id = self
            .options
            .workflow_id
            .clone()
            .unwrap_or_else(|| document.stem());
        schedule::expand(&mut on, &workflow_id).map_err(|err| err.with_location(locate(&["on", "schedule"])))?;

        let plan = WorkflowPlan {
            name: document.display_name(),
            on,
            merged: &merged,
            engine: adapter,
            selection: &selection,
            tools: &tools,
            mcp_servers: &mcp_servers,
            allowed_domains: &allowed_domains,
            safe_outputs: &safe_outputs,
            prompt: &prompt,
            runtime_imports,
            permissions,
            stop_time,
            trial_repo: self.options.trial_repo.as_deref(),
        };
        let workflow = plan.build()?;
        tracing::debug!(path = %path, jobs = workflow.jobs.len(), "safe outputs wired");

        let header = Header {
            source: display_path(&document.source_path, &import_root),
            imports: graph
                .fragments()
                .map(|fragment| fragment.display_path.clone())
                .collect(),
        };
        let yaml = emitter::render_workflow(&workflow, &header).map_err(|err| {
            CompileError::Emission {
                path: lock_path(&document.source_path),
                source: std::io::Error::other(err),
            }
        })?;
        tracing::debug!(path = %path, bytes = yaml.len(), "emitted");
        Ok(yaml)
    }

    /// Parse, compile and (unless `no_emit`) write the lock file.
    pub fn compile_file(&self, path: &Path) -> Result<CompileOutcome> {
        let content = self.loader.load(path).map_err(|source| CompileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document = self.parse_workflow_string(&content, path)?;
        let yaml = self.compile_to_yaml(&document)?;
        let lock_path = lock_path(path);

        let written = !self.options.no_emit;
        if written {
            atomic_write_file(&lock_path, &yaml)?;
            tracing::debug!(path = %lock_path.display(), "wrote lock file");
        }

        Ok(CompileOutcome {
            source: path.to_path_buf(),
            lock_path,
            yaml,
            written,
        })
    }

    /// Remove `on.stop-after` and resolve it to an absolute deadline.
    fn stop_time(&self, document: &WorkflowDocument, on: &mut Value) -> Result<Option<String>> {
        let Some(mapping) = on.as_mapping_mut() else {
            return Ok(None);
        };
        let Some(spec) = mapping.remove("stop-after") else {
            return Ok(None);
        };
        let Some(spec) = spec.as_str() else {
            return Err(CompileError::configuration("on.stop-after must be a string"));
        };

        let previous = self
            .loader
            .load(&lock_path(&document.source_path))
            .inspect_err(|err| tracing::debug!(error = %err, "no previous lock file"))
            .ok();
        let now = self.options.now.unwrap_or_else(Utc::now);
        stop_time::select(spec, previous.as_deref(), self.options.refresh_stop_time, now).map(Some)
    }
}

/// Position of a merged field: the root if it declares the field, else the
/// first fragment in merge order that does.
fn locate_field(document: &WorkflowDocument, graph: &ImportGraph, segments: &[&str]) -> SourceLocation {
    let Some(field) = segments.first() else {
        return SourceLocation::start_of(&document.source_path);
    };
    if document.declares(field) {
        return document.field_location(segments);
    }
    graph
        .fragments()
        .find(|fragment| fragment.document.declares(field))
        .map(|fragment| fragment.document.field_location(segments))
        .unwrap_or_else(|| SourceLocation::start_of(&document.source_path))
}

fn body_location(document: &WorkflowDocument) -> SourceLocation {
    SourceLocation::new(&document.source_path, document.body_line(), 1)
}

/// Strict mode: the agent job holds no write scopes.
fn check_strict(permissions: &Permissions) -> Result<()> {
    let scopes = permissions.write_scopes();
    if scopes.is_empty() {
        return Ok(());
    }
    let names: Vec<&str> = scopes.iter().map(|scope| scope.as_str()).collect();
    Err(CompileError::configuration(format!(
        "strict mode forbids write permissions on the agent job ({}); use safe-outputs for writes",
        names.join(", ")
    )))
}

fn display_path(source: &Path, import_root: &Path) -> String {
    let source = imports::normalize_path(source);
    let root = imports::normalize_path(import_root);
    let relative = if root.as_os_str().is_empty() {
        source.as_path()
    } else {
        source.strip_prefix(&root).unwrap_or(&source)
    };
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
