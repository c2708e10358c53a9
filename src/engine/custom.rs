//! User-defined engine: runs `engine.steps` as written.

use super::{EngineAdapter, EngineContext, EngineId, EngineSelection, McpFormat, MCP_CONFIG_PATH};
use crate::emitter::Step;
use crate::error::{CompileError, Result};
use serde_yaml::Value;

#[derive(Debug, Default)]
pub struct CustomEngine;

impl EngineAdapter for CustomEngine {
    fn id(&self) -> EngineId {
        EngineId::Custom
    }

    fn display_name(&self) -> &'static str {
        "Custom Steps"
    }

    fn description(&self) -> &'static str {
        "Runs the steps listed under engine.steps"
    }

    fn default_version(&self) -> Option<&'static str> {
        None
    }

    fn model_env_var(&self) -> Option<&'static str> {
        None
    }

    fn required_secrets(&self) -> &'static [&'static str] {
        &[]
    }

    fn mcp_format(&self) -> Option<McpFormat> {
        Some(McpFormat::Claude)
    }

    fn validate(&self, selection: &EngineSelection) -> Result<()> {
        if selection.steps.is_empty() {
            return Err(CompileError::configuration(
                "engine 'custom' requires at least one entry in 'engine.steps'",
            ));
        }
        if selection.max_turns.is_some() {
            return Err(CompileError::configuration(
                "engine 'custom' does not support 'max-turns'",
            ));
        }
        Ok(())
    }

    fn installation_steps(&self, _ctx: &EngineContext<'_>) -> Result<Vec<Step>> {
        Ok(Vec::new())
    }

    /// User steps, each given the prompt path and MCP config path unless it
    /// already sets them.
    fn execution_steps(&self, ctx: &EngineContext<'_>) -> Result<Vec<Step>> {
        ctx.selection
            .steps
            .iter()
            .map(|value| {
                let mut step = Step::from_value(value)?;
                if step.run.is_none() && step.uses.is_none() {
                    return Err(CompileError::configuration(
                        "each engine step must have 'run' or 'uses'",
                    ));
                }
                step.env
                    .entry("GH_AW_PROMPT".to_string())
                    .or_insert_with(|| Value::from(ctx.prompt_path));
                if !ctx.mcp_servers.is_empty() {
                    step.env
                        .entry("GH_AW_MCP_CONFIG".to_string())
                        .or_insert_with(|| Value::from(MCP_CONFIG_PATH));
                }
                for (key, value) in &ctx.selection.env {
                    step.env
                        .entry(key.clone())
                        .or_insert_with(|| Value::from(value.as_str()));
                }
                Ok(step)
            })
            .collect()
    }
}
