//! Safe outputs: the only channel through which an agent may write.
//!
//! The agent job runs with read permissions and records the actions it
//! wants taken (open an issue, add a comment, ...) as structured output.
//! That output is validated against the declared allow-list and handed to
//! one downstream job per declared kind, each holding only the write
//! permissions its kind needs.

mod wiring;


pub use wiring::{
    AGENT_OUTPUT_ARTIFACT, AGENT_OUTPUT_PATH, COLLECT_STEP_ID, OUTPUTS_PATH, WiringOptions,
    agent_env, agent_outputs, collect_steps, output_jobs, setup_step,
};

use crate::engine::ToolSet;
use crate::error::{CompileError, Result, SchemaErrorKind, SourceLocation};
use crate::permissions::{PermissionLevel, PermissionScope, Permissions};
use crate::suggest;
use regex::Regex;
use serde_json::{Map, Value as Json};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

static BODY_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"safe-outputs\.([A-Za-z][A-Za-z0-9_-]*)").expect("Invalid safe output reference regex")
});

/// Keys under `safe-outputs` that configure all kinds at once.
const GLOBAL_OPTIONS: &[&str] = &["github-token", "staged"];

/// A kind of write the agent may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SafeOutputKind {
    AddComment,
    AddLabels,
    CreateDiscussion,
    CreateIssue,
    CreatePullRequest,
    MissingTool,
    Noop,
    UpdateIssue,
}

impl SafeOutputKind {
    pub const ALL: [SafeOutputKind; 8] = [
        SafeOutputKind::AddComment,
        SafeOutputKind::AddLabels,
        SafeOutputKind::CreateDiscussion,
        SafeOutputKind::CreateIssue,
        SafeOutputKind::CreatePullRequest,
        SafeOutputKind::MissingTool,
        SafeOutputKind::Noop,
        SafeOutputKind::UpdateIssue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SafeOutputKind::AddComment => "add-comment",
            SafeOutputKind::AddLabels => "add-labels",
            SafeOutputKind::CreateDiscussion => "create-discussion",
            SafeOutputKind::CreateIssue => "create-issue",
            SafeOutputKind::CreatePullRequest => "create-pull-request",
            SafeOutputKind::MissingTool => "missing-tool",
            SafeOutputKind::Noop => "noop",
            SafeOutputKind::UpdateIssue => "update-issue",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Identifier form used for job ids and JSON keys (`create_issue`).
    pub fn snake_case(self) -> String {
        self.as_str().replace('-', "_")
    }

    /// Items of this kind accepted per run when `max` is not set.
    pub fn default_max(self) -> u32 {
        match self {
            SafeOutputKind::MissingTool | SafeOutputKind::Noop => 20,
            _ => 1,
        }
    }

    /// Least-privilege permissions for the job that performs the write.
    pub fn permissions(self) -> Permissions {
        use PermissionLevel::{Read, Write};
        use PermissionScope::*;

        let grants: &[(PermissionScope, PermissionLevel)] = match self {
            SafeOutputKind::AddComment => &[
                (Contents, Read),
                (Discussions, Write),
                (Issues, Write),
                (PullRequests, Write),
            ],
            SafeOutputKind::AddLabels => &[(Contents, Read), (Issues, Write), (PullRequests, Write)],
            SafeOutputKind::CreateDiscussion => &[(Contents, Read), (Discussions, Write)],
            SafeOutputKind::CreateIssue | SafeOutputKind::UpdateIssue => {
                &[(Contents, Read), (Issues, Write)]
            }
            SafeOutputKind::CreatePullRequest => {
                &[(Contents, Write), (Issues, Write), (PullRequests, Write)]
            }
            SafeOutputKind::MissingTool | SafeOutputKind::Noop => &[(Contents, Read)],
        };
        Permissions::explicit(grants.iter().copied())
    }

    /// Job outputs the handler step sets, by name.
    pub fn job_outputs(self) -> &'static [&'static str] {
        match self {
            SafeOutputKind::AddComment => &["comment_id", "comment_url"],
            SafeOutputKind::AddLabels => &["labels_added"],
            SafeOutputKind::CreateDiscussion => &["discussion_number", "discussion_url"],
            SafeOutputKind::CreateIssue | SafeOutputKind::UpdateIssue => {
                &["issue_number", "issue_url"]
            }
            SafeOutputKind::CreatePullRequest => &["pull_request_number", "pull_request_url"],
            SafeOutputKind::MissingTool => &["tools_reported", "total_count"],
            SafeOutputKind::Noop => &["noop_message"],
        }
    }

    /// Whether the handler needs the repository checked out.
    pub fn needs_checkout(self) -> bool {
        self == SafeOutputKind::CreatePullRequest
    }
}

impl fmt::Display for SafeOutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings of one declared kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SafeOutputConfig {
    pub max: u32,
    /// Kind specific options (`title-prefix`, `labels`, `target`, ...) in
    /// their JSON form.
    pub options: BTreeMap<String, Json>,
}

/// The declared `safe-outputs` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SafeOutputs {
    outputs: BTreeMap<SafeOutputKind, SafeOutputConfig>,
    /// Preview mode: handlers report what they would do without writing.
    pub staged: bool,
    pub github_token: Option<String>,
}

impl SafeOutputs {
    /// Parse the merged `safe-outputs` map.
    ///
    /// `locate` maps a field path (`["safe-outputs", "create-isue"]`) to a
    /// source position for errors.
    pub fn parse<F>(section: &BTreeMap<String, Value>, locate: F) -> Result<Self>
    where
        F: Fn(&[&str]) -> SourceLocation,
    {
        let mut outputs = SafeOutputs::default();

        for (name, value) in section {
            match name.as_str() {
                "staged" => {
                    outputs.staged = value
                        .as_bool()
                        .ok_or_else(|| global_option_error(name, "a boolean", &locate))?
                }
                "github-token" => {
                    let token = value
                        .as_str()
                        .ok_or_else(|| global_option_error(name, "a string", &locate))?;
                    outputs.github_token = Some(token.to_string());
                }
                _ => {
                    let Some(kind) = SafeOutputKind::parse(name) else {
                        return Err(unknown_kind(name, locate(&["safe-outputs", name])));
                    };
                    if let Some(config) = parse_kind(kind, value, &locate)? {
                        outputs.outputs.insert(kind, config);
                    }
                }
            }
        }

        Ok(outputs)
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn contains(&self, kind: SafeOutputKind) -> bool {
        self.outputs.contains_key(&kind)
    }

    pub fn get(&self, kind: SafeOutputKind) -> Option<&SafeOutputConfig> {
        self.outputs.get(&kind)
    }

    /// Declared kinds with their settings, in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (SafeOutputKind, &SafeOutputConfig)> {
        self.outputs.iter().map(|(kind, config)| (*kind, config))
    }

    /// Canonical JSON allow-list handed to the agent and the validator.
    ///
    /// Keys are sorted, so equal declarations always serialize equally.
    pub fn config_json(&self) -> String {
        let mut document = Map::new();
        for (kind, config) in self.iter() {
            let mut entry = Map::new();
            entry.insert("max".to_string(), Json::from(config.max));
            for (key, value) in &config.options {
                entry.insert(key.replace('-', "_"), value.clone());
            }
            document.insert(kind.snake_case(), Json::Object(entry));
        }
        Json::Object(document).to_string()
    }

    /// The agent never gets GitHub write tools, declared safe output or not.
    pub fn check_write_tools(&self, tools: &ToolSet) -> Result<()> {
        let offending: Vec<String> = tools
            .github_write_tools()
            .into_iter()
            .map(|(tool, kind)| {
                let declared = SafeOutputKind::parse(kind).is_some_and(|kind| self.contains(kind));
                if declared {
                    format!("'{}' (already covered by safe-outputs.{})", tool, kind)
                } else {
                    format!("'{}' (use safe-outputs.{})", tool, kind)
                }
            })
            .collect();

        if offending.is_empty() {
            return Ok(());
        }
        Err(CompileError::configuration(format!(
            "tools.github.allowed cannot contain write tools; the agent writes only through safe outputs: {}",
            offending.join(", ")
        )))
    }

    /// The prompt may only mention declared kinds.
    pub fn check_body_references(&self, body: &str) -> Result<()> {
        let referenced: BTreeSet<&str> = BODY_REFERENCE
            .captures_iter(body)
            .filter_map(|captures| captures.get(1))
            .map(|m| m.as_str())
            .filter(|name| !GLOBAL_OPTIONS.contains(name))
            .collect();

        for name in referenced {
            let declared = SafeOutputKind::parse(name).is_some_and(|kind| self.contains(kind));
            if !declared {
                let declared_names: Vec<&str> = self.iter().map(|(kind, _)| kind.as_str()).collect();
                let suggestions =
                    suggest::rank(name, declared_names.iter().copied(), suggest::MAX_SUGGESTIONS);
                let mut message = format!(
                    "the prompt references safe-outputs.{} but it is not declared under 'safe-outputs'",
                    name
                );
                if !suggestions.is_empty() {
                    message.push_str(". ");
                    message.push_str(&suggest::did_you_mean(&suggestions));
                }
                return Err(CompileError::Configuration {
                    message,
                    location: None,
                    suggestions,
                });
            }
        }
        Ok(())
    }
}

fn parse_kind<F>(kind: SafeOutputKind, value: &Value, locate: &F) -> Result<Option<SafeOutputConfig>>
where
    F: Fn(&[&str]) -> SourceLocation,
{
    let mut config = SafeOutputConfig {
        max: kind.default_max(),
        options: BTreeMap::new(),
    };

    match value {
        Value::Null | Value::Bool(true) => return Ok(Some(config)),
        Value::Bool(false) => return Ok(None),
        Value::Mapping(mapping) => {
            for (key, value) in mapping {
                let Some(key) = key.as_str() else {
                    continue;
                };
                if key == "max" {
                    config.max = value
                        .as_u64()
                        .and_then(|max| u32::try_from(max).ok())
                        .filter(|max| *max >= 1)
                        .ok_or_else(|| CompileError::Schema {
                            kind: SchemaErrorKind::InvalidField,
                            field_path: format!("/safe-outputs/{}/max", kind),
                            location: locate(&["safe-outputs", kind.as_str(), "max"]),
                            message: "max must be a positive integer".to_string(),
                        })?;
                } else {
                    let json = serde_json::to_value(value).map_err(|err| CompileError::Schema {
                        kind: SchemaErrorKind::InvalidField,
                        field_path: format!("/safe-outputs/{}/{}", kind, key),
                        location: locate(&["safe-outputs", kind.as_str(), key]),
                        message: format!("option cannot be represented as JSON: {}", err),
                    })?;
                    config.options.insert(key.to_string(), json);
                }
            }
        }
        _ => {
            return Err(CompileError::Schema {
                kind: SchemaErrorKind::InvalidField,
                field_path: format!("/safe-outputs/{}", kind),
                location: locate(&["safe-outputs", kind.as_str()]),
                message: "expected a mapping, true, false or null".to_string(),
            });
        }
    }

    Ok(Some(config))
}

fn global_option_error<F>(name: &str, expected: &str, locate: &F) -> CompileError
where
    F: Fn(&[&str]) -> SourceLocation,
{
    CompileError::Schema {
        kind: SchemaErrorKind::InvalidField,
        field_path: format!("/safe-outputs/{}", name),
        location: locate(&["safe-outputs", name]),
        message: format!("expected {}", expected),
    }
}

fn unknown_kind(name: &str, location: SourceLocation) -> CompileError {
    let candidates = SafeOutputKind::ALL
        .iter()
        .map(|kind| kind.as_str())
        .chain(GLOBAL_OPTIONS.iter().copied());
    let suggestions = suggest::rank(name, candidates, suggest::MAX_SUGGESTIONS);
    let mut message = format!("unknown safe output kind '{}'", name);
    if !suggestions.is_empty() {
        message.push_str(". ");
        message.push_str(&suggest::did_you_mean(&suggestions));
    }
    CompileError::Schema {
        kind: SchemaErrorKind::UnknownField,
        field_path: format!("/safe-outputs/{}", name),
        location,
        message,
    }
}
