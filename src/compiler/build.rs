//! Assembles the jobs of a compiled workflow.
//!
//! Job layout:
//!
//! - `activation` (only when a pre-flight check is needed): role membership
//!   for user-triggered events and the stop-after deadline
//! - `agent`: prompt, engine install, MCP config, agent run, output
//!   collection
//! - one job per declared safe output kind

use super::expressions::PromptExpressions;
use crate::emitter::{CompiledWorkflow, Job, Step};
use crate::engine::{EngineAdapter, EngineContext, EngineSelection, LOG_DIR, McpServer, ToolSet};
use crate::error::{CompileError, Result};
use crate::frontmatter::Frontmatter;
use crate::permissions::{PermissionLevel, PermissionScope, Permissions};
use crate::runtime;
use crate::safe_outputs::{self, SafeOutputs, WiringOptions};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

pub const ACTIVATION_JOB: &str = "activation";
pub const AGENT_JOB: &str = "agent";

const DEFAULT_RUNS_ON: &str = "ubuntu-latest";
const DEFAULT_TIMEOUT_MINUTES: u32 = 20;
const PROMPT_DELIMITER: &str = "GH_AW_PROMPT_EOF";
const CACHE_MEMORY_DIR: &str = "/tmp/gh-aw/cache-memory";

/// Events whose actor may be an arbitrary user; these get a role check.
const USER_EVENTS: &[&str] = &[
    "discussion",
    "discussion_comment",
    "issue_comment",
    "issues",
    "pull_request",
    "pull_request_review",
    "pull_request_review_comment",
];

/// Everything the builder needs, resolved by earlier stages.
pub(crate) struct WorkflowPlan<'a> {
    pub name: String,
    pub on: Value,
    pub merged: &'a Frontmatter,
    pub engine: &'a dyn EngineAdapter,
    pub selection: &'a EngineSelection,
    pub tools: &'a ToolSet,
    pub mcp_servers: &'a [McpServer],
    pub allowed_domains: &'a [String],
    pub safe_outputs: &'a SafeOutputs,
    pub prompt: &'a PromptExpressions,
    /// The prompt contains `{{#runtime-import}}` macros.
    pub runtime_imports: bool,
    pub permissions: Permissions,
    pub stop_time: Option<String>,
    pub trial_repo: Option<&'a str>,
}

impl WorkflowPlan<'_> {
    pub fn build(&self) -> Result<CompiledWorkflow> {
        let mut jobs = BTreeMap::new();

        let activation = self.activation_job();
        let mut agent = self.agent_job()?;
        match &activation {
            Some(_) => {
                agent.needs = vec![ACTIVATION_JOB.to_string()];
                agent.condition = Some(format!(
                    "needs.{}.outputs.activated == 'true'",
                    ACTIVATION_JOB
                ));
            }
            None => agent.condition = self.merged.condition.clone(),
        }
        if let Some(activation) = activation {
            jobs.insert(ACTIVATION_JOB.to_string(), activation);
        }
        jobs.insert(AGENT_JOB.to_string(), agent);

        let wiring = WiringOptions {
            trial_repo: self.trial_repo,
            github_token: self.merged.github_token.as_deref(),
            agent_job: AGENT_JOB,
        };
        for (id, job) in safe_outputs::output_jobs(self.safe_outputs, &wiring) {
            jobs.insert(id, job);
        }

        let mut env = self.merged.env.clone();
        if let Some(repo) = self.trial_repo {
            env.insert("GH_AW_TRIAL_REPO".to_string(), Value::from(repo));
        }

        Ok(CompiledWorkflow {
            name: self.name.clone(),
            on: self.on.clone(),
            permissions: Some(Permissions::default()),
            concurrency: Some(
                self.merged
                    .concurrency
                    .clone()
                    .unwrap_or_else(default_concurrency),
            ),
            run_name: self.merged.run_name.clone(),
            env,
            jobs,
        })
    }

    fn user_triggered(&self) -> bool {
        match &self.on {
            Value::String(event) => USER_EVENTS.contains(&event.as_str()),
            Value::Sequence(events) => events
                .iter()
                .filter_map(Value::as_str)
                .any(|event| USER_EVENTS.contains(&event)),
            Value::Mapping(mapping) => mapping
                .keys()
                .filter_map(Value::as_str)
                .any(|event| USER_EVENTS.contains(&event)),
            _ => false,
        }
    }

    fn activation_job(&self) -> Option<Job> {
        let roles = self.merged.roles.clone().unwrap_or_default();
        let check_roles = !roles.allows_everyone() && self.user_triggered();
        if !check_roles && self.stop_time.is_none() {
            return None;
        }

        let mut steps = vec![runtime::setup_scripts_step()];
        let mut conditions = Vec::new();
        if check_roles {
            steps.push(
                runtime::script_step("Check team membership for workflow", "check_membership")
                    .with_id("check_membership")
                    .with_env("GH_AW_REQUIRED_ROLES", roles.0.join(",")),
            );
            conditions.push("steps.check_membership.outputs.is_team_member == 'true'");
        }
        if let Some(stop_time) = &self.stop_time {
            steps.push(
                runtime::script_step("Check stop-time limit", "check_stop_time")
                    .with_id("check_stop_time")
                    .with_env(super::stop_time::STOP_TIME_ENV, stop_time.as_str())
                    .with_env("GH_AW_WORKFLOW_NAME", self.name.as_str()),
            );
            conditions.push("steps.check_stop_time.outputs.stop_time_ok == 'true'");
        }

        Some(Job {
            condition: self.merged.condition.clone(),
            runs_on: Value::from("ubuntu-slim"),
            permissions: Permissions::explicit([(PermissionScope::Contents, PermissionLevel::Read)]),
            outputs: [(
                "activated".to_string(),
                format!("${{{{ {} }}}}", conditions.join(" && ")),
            )]
            .into_iter()
            .collect(),
            steps,
            ..Job::default()
        })
    }

    fn agent_job(&self) -> Result<Job> {
        let ctx = EngineContext {
            selection: self.selection,
            tools: self.tools,
            mcp_servers: self.mcp_servers,
            allowed_domains: self.allowed_domains,
            prompt_path: crate::engine::PROMPT_PATH,
        };
        let has_safe_outputs = !self.safe_outputs.is_empty();

        let mut steps = vec![
            Step::uses("Checkout repository", "actions/checkout@v4")
                .with_input("persist-credentials", false),
            runtime::setup_scripts_step(),
        ];
        steps.extend(user_steps(&self.merged.steps)?);
        if has_safe_outputs {
            steps.push(safe_outputs::setup_step());
        }
        if self.tools.cache_memory {
            steps.extend(cache_memory_steps());
        }
        steps.push(self.prompt_step()?);
        if self.runtime_imports {
            steps.push(
                runtime::script_step("Expand runtime imports", "runtime_import")
                    .with_env("GH_AW_PROMPT", crate::engine::PROMPT_PATH),
            );
        }
        steps.extend(self.engine.installation_steps(&ctx)?);
        steps.extend(self.engine.mcp_config_steps(&ctx));
        steps.extend(self.engine.execution_steps(&ctx)?);
        if has_safe_outputs {
            steps.extend(safe_outputs::collect_steps());
        }
        steps.extend(user_steps(&self.merged.post_steps)?);
        steps.push(
            Step::uses("Upload agent logs", "actions/upload-artifact@v4")
                .when("always()")
                .with_input("name", "agent-logs")
                .with_input("path", LOG_DIR)
                .with_input("if-no-files-found", "ignore"),
        );

        let mut env = BTreeMap::new();
        if has_safe_outputs {
            env.extend(safe_outputs::agent_env(self.safe_outputs));
        }
        if let Some(tracker) = &self.merged.tracker_id {
            env.insert("GH_AW_TRACKER_ID".to_string(), Value::from(tracker.as_str()));
        }

        Ok(Job {
            runs_on: self
                .merged
                .runs_on
                .clone()
                .unwrap_or_else(|| Value::from(DEFAULT_RUNS_ON)),
            permissions: self.permissions.clone(),
            environment: self.merged.environment.clone(),
            container: self.merged.container.clone(),
            timeout_minutes: Some(
                self.merged
                    .timeout_minutes
                    .unwrap_or(DEFAULT_TIMEOUT_MINUTES),
            ),
            env,
            outputs: if has_safe_outputs {
                safe_outputs::agent_outputs()
            } else {
                BTreeMap::new()
            },
            steps,
            ..Job::default()
        })
    }

    /// Writes the prompt to disk, substituting expression placeholders.
    fn prompt_step(&self) -> Result<Step> {
        let text = self.prompt.text.trim_end_matches('\n');
        if text.lines().any(|line| line == PROMPT_DELIMITER) {
            return Err(CompileError::configuration(format!(
                "the prompt body may not contain a line consisting of '{}'",
                PROMPT_DELIMITER
            )));
        }

        let target = if self.prompt.is_empty() {
            "\"$GH_AW_PROMPT\"".to_string()
        } else {
            "\"$GH_AW_PROMPT.template\"".to_string()
        };
        let mut script = format!(
            "mkdir -p \"$(dirname \"$GH_AW_PROMPT\")\"\ncat > {target} << '{delim}'\n{text}\n{delim}\n",
            target = target,
            delim = PROMPT_DELIMITER,
            text = text,
        );
        if !self.prompt.is_empty() {
            script.push_str(&format!(
                "envsubst '{}' < {} > \"$GH_AW_PROMPT\"\n",
                self.prompt.envsubst_filter(),
                target
            ));
        }

        let mut step =
            Step::run("Create prompt", script).with_env("GH_AW_PROMPT", crate::engine::PROMPT_PATH);
        for (name, expression) in self.prompt.env() {
            step = step.with_env(name, expression);
        }
        Ok(step)
    }
}

/// Persist `/tmp/gh-aw/cache-memory` across runs of the same workflow.
fn cache_memory_steps() -> Vec<Step> {
    vec![
        Step::run(
            "Create cache-memory directory",
            format!("mkdir -p {}\n", CACHE_MEMORY_DIR),
        ),
        Step::uses("Restore cache memory", "actions/cache@v4")
            .with_input("key", "memory-${{ github.workflow }}-${{ github.run_id }}")
            .with_input("path", CACHE_MEMORY_DIR)
            .with_input("restore-keys", "memory-${{ github.workflow }}-"),
    ]
}

fn user_steps(values: &[Value]) -> Result<Vec<Step>> {
    values.iter().map(Step::from_value).collect()
}

fn default_concurrency() -> Value {
    let mut mapping = Mapping::new();
    mapping.insert(
        Value::from("group"),
        Value::from("gh-aw-${{ github.workflow }}"),
    );
    Value::Mapping(mapping)
}
