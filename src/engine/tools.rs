//! Typed view of the merged `tools` section.

use crate::error::{CompileError, Result};
use crate::suggest;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Tool names accepted under `tools:`.
pub const KNOWN_TOOLS: &[&str] = &[
    "bash",
    "cache-memory",
    "edit",
    "github",
    "playwright",
    "web-fetch",
    "web-search",
];

/// GitHub MCP tools that perform writes, with the safe output that replaces
/// each. None of them may be handed to the agent.
pub const GITHUB_WRITE_TOOLS: &[(&str, &str)] = &[
    ("add_issue_comment", "add-comment"),
    ("add_labels", "add-labels"),
    ("create_discussion", "create-discussion"),
    ("create_issue", "create-issue"),
    ("create_pull_request", "create-pull-request"),
    ("update_issue", "update-issue"),
];

/// Default read-only GitHub toolsets.
pub const DEFAULT_GITHUB_TOOLSETS: &[&str] = &["context", "repos", "issues", "pull_requests"];

/// The GitHub MCP server. It always runs read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubTool {
    /// Allowed tool names; empty means every tool of the enabled toolsets.
    pub allowed: Vec<String>,
    pub toolsets: Vec<String>,
}

impl Default for GithubTool {
    fn default() -> Self {
        Self {
            allowed: Vec::new(),
            toolsets: DEFAULT_GITHUB_TOOLSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BashTool {
    /// `bash: true` or `bash: ["*"]`.
    Any,
    Commands(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaywrightTool {
    pub allowed_domains: Vec<String>,
}

/// Tools available to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSet {
    pub github: Option<GithubTool>,
    pub bash: Option<BashTool>,
    pub edit: bool,
    pub web_fetch: bool,
    pub web_search: bool,
    pub playwright: Option<PlaywrightTool>,
    pub cache_memory: bool,
}

impl Default for ToolSet {
    /// The GitHub tool is on unless disabled with `github: false`.
    fn default() -> Self {
        Self {
            github: Some(GithubTool::default()),
            bash: None,
            edit: false,
            web_fetch: false,
            web_search: false,
            playwright: None,
            cache_memory: false,
        }
    }
}

impl ToolSet {
    pub fn from_map(tools: &BTreeMap<String, Value>) -> Result<Self> {
        let mut set = ToolSet::default();

        for (name, value) in tools {
            let enabled = !matches!(value, Value::Bool(false));
            match name.as_str() {
                "github" => set.github = enabled.then(|| github_tool(value)).transpose()?,
                "bash" => set.bash = enabled.then(|| bash_tool(value)).transpose()?,
                "edit" => set.edit = enabled,
                "web-fetch" => set.web_fetch = enabled,
                "web-search" => set.web_search = enabled,
                "cache-memory" => set.cache_memory = enabled,
                "playwright" => {
                    set.playwright = enabled.then(|| PlaywrightTool {
                        allowed_domains: string_list(value, "allowed_domains"),
                    })
                }
                unknown => return Err(unknown_tool(unknown)),
            }
        }
        Ok(set)
    }

    /// GitHub write tools in the allow-list, paired with the safe output
    /// they require.
    pub fn github_write_tools(&self) -> Vec<(&'static str, &'static str)> {
        let Some(github) = &self.github else {
            return Vec::new();
        };
        GITHUB_WRITE_TOOLS
            .iter()
            .copied()
            .filter(|(tool, _)| github.allowed.iter().any(|a| a == tool))
            .collect()
    }
}

fn unknown_tool(name: &str) -> CompileError {
    let suggestions = suggest::rank(name, KNOWN_TOOLS.iter().copied(), suggest::MAX_SUGGESTIONS);
    let mut message = format!(
        "unknown tool '{}'; custom servers belong under 'mcp-servers'",
        name
    );
    if !suggestions.is_empty() {
        message.push_str(". ");
        message.push_str(&suggest::did_you_mean(&suggestions));
    }
    CompileError::Configuration {
        message,
        location: None,
        suggestions,
    }
}

fn github_tool(value: &Value) -> Result<GithubTool> {
    let mut tool = GithubTool::default();
    let Value::Mapping(_) = value else {
        return Ok(tool);
    };

    tool.allowed = string_list(value, "allowed");
    let toolsets = string_list(value, "toolsets");
    if !toolsets.is_empty() {
        tool.toolsets = toolsets;
    }
    match value.get("read-only") {
        None | Some(Value::Null) | Some(Value::Bool(true)) => {}
        Some(Value::Bool(false)) => {
            return Err(CompileError::configuration(
                "tools.github.read-only cannot be false; writes go through 'safe-outputs'",
            ));
        }
        Some(_) => {
            return Err(CompileError::configuration(
                "tools.github.read-only must be a boolean",
            ));
        }
    }
    Ok(tool)
}

fn bash_tool(value: &Value) -> Result<BashTool> {
    match value {
        Value::Null | Value::Bool(true) => Ok(BashTool::Any),
        Value::Sequence(items) => {
            let commands: Vec<String> = items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        CompileError::configuration("tools.bash entries must be strings")
                    })
                })
                .collect::<Result<_>>()?;
            if commands.iter().any(|c| c == "*" || c == ":*") {
                Ok(BashTool::Any)
            } else {
                Ok(BashTool::Commands(commands))
            }
        }
        _ => Err(CompileError::configuration(
            "tools.bash must be true or a list of commands",
        )),
    }
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_sequence)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
