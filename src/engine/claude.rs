//! Claude Code engine.

use super::tools::BashTool;
use super::{
    EngineAdapter, EngineContext, EngineId, LOG_DIR, McpFormat, MCP_CONFIG_PATH, command_line,
    execution_env, npm_install_step, secret_check_step, setup_node_step,
};
use crate::emitter::Step;
use crate::error::Result;
use std::collections::BTreeSet;

const CLAUDE_PACKAGE: &str = "@anthropic-ai/claude-code";

#[derive(Debug, Default)]
pub struct ClaudeEngine;

impl EngineAdapter for ClaudeEngine {
    fn id(&self) -> EngineId {
        EngineId::Claude
    }

    fn display_name(&self) -> &'static str {
        "Claude Code"
    }

    fn description(&self) -> &'static str {
        "Runs Claude Code in print mode with MCP server support"
    }

    fn default_version(&self) -> Option<&'static str> {
        Some("2.0.42")
    }

    fn model_env_var(&self) -> Option<&'static str> {
        Some("ANTHROPIC_MODEL")
    }

    fn required_secrets(&self) -> &'static [&'static str] {
        &["ANTHROPIC_API_KEY"]
    }

    fn supports_max_turns(&self) -> bool {
        true
    }

    fn mcp_format(&self) -> Option<McpFormat> {
        Some(McpFormat::Claude)
    }

    fn installation_steps(&self, ctx: &EngineContext<'_>) -> Result<Vec<Step>> {
        let mut steps: Vec<Step> = secret_check_step(self).into_iter().collect();
        steps.push(setup_node_step());
        steps.push(npm_install_step(
            self.display_name(),
            CLAUDE_PACKAGE,
            ctx.version(self),
        ));
        Ok(steps)
    }

    fn execution_steps(&self, ctx: &EngineContext<'_>) -> Result<Vec<Step>> {
        let mut args: Vec<String> = vec![
            "claude".into(),
            "--print".into(),
            "--verbose".into(),
            "--output-format".into(),
            "stream-json".into(),
            "--permission-mode".into(),
            "bypassPermissions".into(),
        ];
        if !ctx.mcp_servers.is_empty() {
            args.push("--mcp-config".into());
            args.push(MCP_CONFIG_PATH.into());
        }
        let tools = allowed_tools(ctx);
        if !tools.is_empty() {
            args.push("--allowed-tools".into());
            args.push(tools.into_iter().collect::<Vec<_>>().join(","));
        }
        if let Some(turns) = ctx.selection.max_turns {
            args.push("--max-turns".into());
            args.push(turns.to_string());
        }
        args.extend(ctx.selection.args.iter().cloned());

        let log_file = format!("{}agent-stdio.log", LOG_DIR);
        let script = format!(
            "set -o pipefail\nmkdir -p {dir}\n{command} 2>&1 | tee {log}\n",
            dir = LOG_DIR,
            command = command_line(&args, None, ctx.prompt_path),
            log = log_file,
        );

        let mut step = Step::run("Execute Claude Code CLI", script).with_id("agentic_execution");
        step.env = execution_env(self, ctx);
        step.env
            .insert("DISABLE_TELEMETRY".to_string(), "1".into());
        Ok(vec![step])
    }
}

/// `--allowed-tools` entries, sorted.
fn allowed_tools(ctx: &EngineContext<'_>) -> BTreeSet<String> {
    let mut allowed = BTreeSet::new();
    let tools = ctx.tools;

    match &tools.bash {
        Some(BashTool::Any) => {
            allowed.insert("Bash".to_string());
        }
        Some(BashTool::Commands(commands)) => {
            allowed.extend(commands.iter().map(|c| format!("Bash({})", c)));
        }
        None => {}
    }
    if tools.edit {
        allowed.extend(["Edit", "MultiEdit", "NotebookEdit", "Write"].map(String::from));
    }
    if tools.web_fetch {
        allowed.insert("WebFetch".to_string());
    }
    if tools.web_search {
        allowed.insert("WebSearch".to_string());
    }
    allowed.extend(["Glob", "Grep", "LS", "Read", "Task", "TodoWrite"].map(String::from));

    for server in ctx.mcp_servers {
        if server.allowed.is_empty() {
            allowed.insert(format!("mcp__{}", server.name));
        } else {
            allowed.extend(
                server
                    .allowed
                    .iter()
                    .map(|tool| format!("mcp__{}__{}", server.name, tool)),
            );
        }
    }
    allowed
}
