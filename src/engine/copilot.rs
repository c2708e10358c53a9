//! GitHub Copilot CLI engines.

use super::tools::BashTool;
use super::{
    EngineAdapter, EngineContext, EngineId, LOG_DIR, McpFormat, MCP_CONFIG_PATH, command_line,
    execution_env, npm_install_step, secret_check_step, setup_node_step,
};
use crate::emitter::Step;
use crate::error::Result;
use crate::runtime;
use std::collections::BTreeSet;

const COPILOT_PACKAGE: &str = "@github/copilot";
const COPILOT_SDK_PACKAGE: &str = "@github/copilot-sdk";
/// Runner shipped in the helper-script bundle the agent job unpacks first.
const SDK_RUNNER: &str = "copilot_sdk_runner";

/// The Copilot CLI in prompt mode. Default engine.
#[derive(Debug, Default)]
pub struct CopilotEngine;

/// The Copilot SDK driven by a node runner script.
#[derive(Debug, Default)]
pub struct CopilotSdkEngine;

impl EngineAdapter for CopilotEngine {
    fn id(&self) -> EngineId {
        EngineId::Copilot
    }

    fn display_name(&self) -> &'static str {
        "GitHub Copilot CLI"
    }

    fn description(&self) -> &'static str {
        "Runs the GitHub Copilot CLI with MCP server support"
    }

    fn default_version(&self) -> Option<&'static str> {
        Some("0.0.354")
    }

    fn model_env_var(&self) -> Option<&'static str> {
        Some("COPILOT_MODEL")
    }

    fn required_secrets(&self) -> &'static [&'static str] {
        &["COPILOT_GITHUB_TOKEN"]
    }

    fn mcp_format(&self) -> Option<McpFormat> {
        Some(McpFormat::Copilot)
    }

    fn installation_steps(&self, ctx: &EngineContext<'_>) -> Result<Vec<Step>> {
        let mut steps: Vec<Step> = secret_check_step(self).into_iter().collect();
        steps.push(setup_node_step());
        steps.push(npm_install_step(
            self.display_name(),
            COPILOT_PACKAGE,
            ctx.version(self),
        ));
        Ok(steps)
    }

    fn execution_steps(&self, ctx: &EngineContext<'_>) -> Result<Vec<Step>> {
        let mut args: Vec<String> = vec![
            "copilot".into(),
            "--add-dir".into(),
            "/tmp/gh-aw/".into(),
            "--log-level".into(),
            "all".into(),
            "--log-dir".into(),
            LOG_DIR.into(),
        ];
        if !ctx.mcp_servers.is_empty() {
            args.push("--additional-mcp-config".into());
            args.push(format!("@{}", MCP_CONFIG_PATH));
        }
        for tool in allowed_tools(ctx) {
            args.push("--allow-tool".into());
            args.push(tool);
        }
        args.extend(ctx.selection.args.iter().cloned());

        let script = format!(
            "mkdir -p {}\n{}\n",
            LOG_DIR,
            command_line(&args, Some("--prompt"), ctx.prompt_path)
        );

        let mut step = Step::run("Execute GitHub Copilot CLI", script).with_id("agentic_execution");
        step.env = execution_env(self, ctx);
        Ok(vec![step])
    }
}

impl EngineAdapter for CopilotSdkEngine {
    fn id(&self) -> EngineId {
        EngineId::CopilotSdk
    }

    fn display_name(&self) -> &'static str {
        "GitHub Copilot SDK"
    }

    fn description(&self) -> &'static str {
        "Runs Copilot through the SDK with a node runner"
    }

    fn default_version(&self) -> Option<&'static str> {
        Some("0.1.4")
    }

    fn model_env_var(&self) -> Option<&'static str> {
        Some("COPILOT_MODEL")
    }

    fn required_secrets(&self) -> &'static [&'static str] {
        &["COPILOT_GITHUB_TOKEN"]
    }

    fn supports_max_turns(&self) -> bool {
        true
    }

    fn mcp_format(&self) -> Option<McpFormat> {
        Some(McpFormat::Copilot)
    }

    fn installation_steps(&self, ctx: &EngineContext<'_>) -> Result<Vec<Step>> {
        let mut steps: Vec<Step> = secret_check_step(self).into_iter().collect();
        steps.push(setup_node_step());
        steps.push(npm_install_step(
            CopilotEngine.display_name(),
            COPILOT_PACKAGE,
            CopilotEngine.default_version(),
        ));
        steps.push(npm_install_step(
            self.display_name(),
            COPILOT_SDK_PACKAGE,
            ctx.version(self),
        ));
        Ok(steps)
    }

    fn execution_steps(&self, ctx: &EngineContext<'_>) -> Result<Vec<Step>> {
        let mut args: Vec<String> = vec!["node".into(), runtime::script_path(SDK_RUNNER)];
        args.extend(ctx.selection.args.iter().cloned());
        let script = format!("{}\n", shell_words::join(&args));

        let mut step = Step::run("Execute GitHub Copilot SDK", script).with_id("agentic_execution");
        step.env = execution_env(self, ctx);
        step.env.insert(
            "GH_AW_ALLOWED_TOOLS".to_string(),
            allowed_tools(ctx).into_iter().collect::<Vec<_>>().join(",").into(),
        );
        if let Some(turns) = ctx.selection.max_turns {
            step.env
                .insert("GH_AW_MAX_TURNS".to_string(), turns.to_string().into());
        }
        Ok(vec![step])
    }
}

/// `--allow-tool` values for the effective tools, sorted.
fn allowed_tools(ctx: &EngineContext<'_>) -> BTreeSet<String> {
    let mut allowed = BTreeSet::new();
    let tools = ctx.tools;

    match &tools.bash {
        Some(BashTool::Any) => {
            allowed.insert("shell".to_string());
        }
        Some(BashTool::Commands(commands)) => {
            allowed.extend(commands.iter().map(|c| format!("shell({})", c)));
        }
        None => {}
    }
    if tools.edit {
        allowed.insert("write".to_string());
    }
    if tools.web_fetch {
        allowed.insert("web_fetch".to_string());
    }
    if tools.web_search {
        allowed.insert("web_search".to_string());
    }

    for server in ctx.mcp_servers {
        if server.allowed.is_empty() {
            allowed.insert(server.name.clone());
        } else {
            allowed.extend(
                server
                    .allowed
                    .iter()
                    .map(|tool| format!("{}({})", server.name, tool)),
            );
        }
    }
    allowed
}
