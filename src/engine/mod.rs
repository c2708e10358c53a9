//! AI engine abstraction.
//!
//! Each supported agent backend implements [`EngineAdapter`] and produces
//! the steps that install it, configure its MCP servers and run it against
//! the compiled prompt. Adapters live in an [`EngineRegistry`] that is built
//! once and passed by reference to every compile.
//!
//! # Selection order
//!
//! 1. The command-line override (`--engine`)
//! 2. The `engine` field of the merged frontmatter
//! 3. The project config `default_engine`
//! 4. `copilot`

mod claude;
mod copilot;
mod custom;
pub mod mcp;
pub mod network;
mod registry;
pub mod tools;

#[cfg(test)]
mod tests;

pub use claude::ClaudeEngine;
pub use copilot::{CopilotEngine, CopilotSdkEngine};
pub use custom::CustomEngine;
pub use mcp::{McpFormat, McpServer, McpTransport};
pub use registry::EngineRegistry;
pub use tools::ToolSet;

use crate::emitter::Step;
use crate::error::{CompileError, Result};
use crate::frontmatter::EngineConfig;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Where the compiled prompt is written on the runner.
pub const PROMPT_PATH: &str = "/tmp/gh-aw/aw-prompts/prompt.txt";
/// Where the MCP config file is written on the runner.
pub const MCP_CONFIG_PATH: &str = "/tmp/gh-aw/mcp-config/mcp-servers.json";
/// Directory engines write logs into.
pub const LOG_DIR: &str = "/tmp/gh-aw/logs/";

/// Identifier of a supported engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EngineId {
    #[default]
    Copilot,
    CopilotSdk,
    Claude,
    Custom,
}

impl EngineId {
    pub const ALL: [EngineId; 4] = [
        EngineId::Copilot,
        EngineId::CopilotSdk,
        EngineId::Claude,
        EngineId::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineId::Copilot => "copilot",
            EngineId::CopilotSdk => "copilot-sdk",
            EngineId::Claude => "claude",
            EngineId::Custom => "custom",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == name)
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an engine selection was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSource {
    /// `--engine` on the command line.
    Override,
    /// The workflow's `engine` field.
    Frontmatter,
    /// `default_engine` from the project config.
    ConfigDefault,
    /// Nothing configured.
    Builtin,
}

/// The engine chosen for one document, with its settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSelection {
    pub id: EngineId,
    pub version: Option<String>,
    pub model: Option<String>,
    pub max_turns: Option<u32>,
    pub env: BTreeMap<String, String>,
    pub args: Vec<String>,
    /// User steps; only `custom` accepts them.
    pub steps: Vec<Value>,
    pub source: Option<SelectionSource>,
}

impl EngineSelection {
    fn from_config(id: EngineId, config: &EngineConfig, source: SelectionSource) -> Self {
        Self {
            id,
            version: config.version.clone(),
            model: config.model.clone(),
            max_turns: config.max_turns,
            env: config.env.clone(),
            args: config.args.clone(),
            steps: config.steps.clone(),
            source: Some(source),
        }
    }

    fn bare(id: EngineId, source: SelectionSource) -> Self {
        Self {
            id,
            source: Some(source),
            ..Self::default()
        }
    }
}

/// Resolve the engine for a document.
///
/// An override that names the same engine as the frontmatter keeps the
/// frontmatter settings; an override naming a different engine starts from
/// empty settings, since model names and arguments are engine specific.
pub fn resolve_selection(
    registry: &EngineRegistry,
    config: Option<&EngineConfig>,
    override_id: Option<&str>,
    default_id: Option<&str>,
) -> Result<EngineSelection> {
    if let Some(name) = override_id {
        let id = registry.get(name)?.id();
        return Ok(match config {
            Some(config) if config.id == name => {
                EngineSelection::from_config(id, config, SelectionSource::Override)
            }
            _ => EngineSelection::bare(id, SelectionSource::Override),
        });
    }

    if let Some(config) = config {
        let id = registry.get(&config.id)?.id();
        return Ok(EngineSelection::from_config(
            id,
            config,
            SelectionSource::Frontmatter,
        ));
    }

    if let Some(name) = default_id {
        let id = registry.get(name)?.id();
        return Ok(EngineSelection::bare(id, SelectionSource::ConfigDefault));
    }

    Ok(EngineSelection::bare(
        EngineId::default(),
        SelectionSource::Builtin,
    ))
}

/// Everything an adapter needs to produce its steps.
#[derive(Debug, Clone, Copy)]
pub struct EngineContext<'a> {
    pub selection: &'a EngineSelection,
    pub tools: &'a ToolSet,
    pub mcp_servers: &'a [McpServer],
    /// Expanded network allow-list.
    pub allowed_domains: &'a [String],
    pub prompt_path: &'a str,
}

impl EngineContext<'_> {
    /// Version to install: the selection's, else the adapter default.
    pub fn version<'s>(&'s self, adapter: &'s dyn EngineAdapter) -> Option<&'s str> {
        self.selection
            .version
            .as_deref()
            .or_else(|| adapter.default_version())
    }

    fn has_server(&self, name: &str) -> bool {
        self.mcp_servers.iter().any(|server| server.name == name)
    }
}

/// One AI engine backend.
pub trait EngineAdapter: Send + Sync + fmt::Debug {
    fn id(&self) -> EngineId;

    fn display_name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// CLI version installed when the workflow does not pin one.
    fn default_version(&self) -> Option<&'static str>;

    /// Env var the CLI reads its model name from.
    fn model_env_var(&self) -> Option<&'static str>;

    /// Repository secrets the engine needs at run time.
    fn required_secrets(&self) -> &'static [&'static str];

    fn supports_max_turns(&self) -> bool {
        false
    }

    /// Config file dialect, or `None` when the engine takes no MCP config.
    fn mcp_format(&self) -> Option<McpFormat>;

    /// Reject settings this engine cannot honor.
    fn validate(&self, selection: &EngineSelection) -> Result<()> {
        if selection.max_turns.is_some() && !self.supports_max_turns() {
            return Err(CompileError::configuration(format!(
                "engine '{}' does not support 'max-turns'",
                self.id()
            )));
        }
        if !selection.steps.is_empty() {
            return Err(CompileError::configuration(format!(
                "engine '{}' does not accept 'steps'; use engine 'custom' to run your own steps",
                self.id()
            )));
        }
        Ok(())
    }

    fn installation_steps(&self, ctx: &EngineContext<'_>) -> Result<Vec<Step>>;

    /// Steps that write the MCP config file the CLI reads.
    fn mcp_config_steps(&self, ctx: &EngineContext<'_>) -> Vec<Step> {
        match self.mcp_format() {
            Some(format) if !ctx.mcp_servers.is_empty() => {
                vec![write_mcp_config_step(ctx.mcp_servers, format)]
            }
            _ => Vec::new(),
        }
    }

    fn execution_steps(&self, ctx: &EngineContext<'_>) -> Result<Vec<Step>>;
}

/// A step that fails early with a readable message when a secret is unset.
pub fn secret_check_step(engine: &dyn EngineAdapter) -> Option<Step> {
    let secrets = engine.required_secrets();
    if secrets.is_empty() {
        return None;
    }

    let mut script = String::new();
    for secret in secrets {
        script.push_str(&format!(
            "if [ -z \"${secret}\" ]; then\n  echo \"::error::{name} requires the {secret} secret\"\n  exit 1\nfi\n",
            secret = secret,
            name = engine.display_name(),
        ));
    }

    let mut step = Step::run(format!("Validate {} secret", secrets.join(", ")), script);
    for secret in secrets {
        step = step.with_env(*secret, format!("${{{{ secrets.{} }}}}", secret));
    }
    Some(step)
}

fn write_mcp_config_step(servers: &[McpServer], format: McpFormat) -> Step {
    let config = mcp::render_config(servers, format);
    let directory = MCP_CONFIG_PATH
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or(".");
    let script = format!(
        "mkdir -p {dir}\ncat > {path} << 'EOF'\n{config}\nEOF\n",
        dir = directory,
        path = MCP_CONFIG_PATH,
        config = config,
    );
    Step::run("Setup MCPs", script)
}

fn setup_node_step() -> Step {
    Step::uses("Setup Node.js", "actions/setup-node@v4").with_input("node-version", "24")
}

fn npm_install_step(name: &str, package: &str, version: Option<&str>) -> Step {
    let spec = match version {
        Some(version) => format!("{}@{}", package, version),
        None => package.to_string(),
    };
    Step::run(
        format!("Install {}", name),
        format!("npm install -g {}\n", shell_words::quote(&spec)),
    )
}

/// Env shared by every hosted-agent execution step.
fn execution_env(
    engine: &dyn EngineAdapter,
    ctx: &EngineContext<'_>,
) -> BTreeMap<String, Value> {
    let mut env = BTreeMap::new();
    for secret in engine.required_secrets() {
        env.insert(
            secret.to_string(),
            Value::from(format!("${{{{ secrets.{} }}}}", secret)),
        );
    }
    if let (Some(var), Some(model)) = (engine.model_env_var(), &ctx.selection.model) {
        env.insert(var.to_string(), Value::from(model.as_str()));
    }
    env.insert(
        "GH_AW_PROMPT".to_string(),
        Value::from(ctx.prompt_path),
    );
    if engine.mcp_format().is_some() && !ctx.mcp_servers.is_empty() {
        env.insert("GH_AW_MCP_CONFIG".to_string(), Value::from(MCP_CONFIG_PATH));
    }
    if !ctx.allowed_domains.is_empty() {
        env.insert(
            "GH_AW_ALLOWED_DOMAINS".to_string(),
            Value::from(ctx.allowed_domains.join(",")),
        );
    }
    if ctx.has_server("safeoutputs") {
        for var in ["GH_AW_SAFE_OUTPUTS", "GH_AW_SAFE_OUTPUTS_CONFIG"] {
            env.insert(
                var.to_string(),
                Value::from(format!("${{{{ env.{} }}}}", var)),
            );
        }
    }
    for (key, value) in &ctx.selection.env {
        env.insert(key.clone(), Value::from(value.as_str()));
    }
    env
}

/// Shell command line: quoted static args, then the prompt read from disk.
fn command_line<I, S>(args: I, prompt_flag: Option<&str>, prompt_path: &str) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = shell_words::join(args);
    match prompt_flag {
        Some(flag) => line.push_str(&format!(" {} \"$(cat {})\"", flag, prompt_path)),
        None => line.push_str(&format!(" \"$(cat {})\"", prompt_path)),
    }
    line
}
