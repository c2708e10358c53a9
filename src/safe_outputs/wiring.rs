//! Steps and jobs that carry safe outputs from the agent to GitHub.

use super::{SafeOutputConfig, SafeOutputKind, SafeOutputs};
use crate::emitter::{Job, Step};
use crate::runtime;
use serde_json::Value as Json;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Where the agent appends its requested outputs (JSON lines).
pub const OUTPUTS_PATH: &str = "/tmp/gh-aw/safeoutputs/outputs.jsonl";
/// Validated output written by the collect step.
pub const AGENT_OUTPUT_PATH: &str = "/tmp/gh-aw/safeoutputs/agent_output.json";
pub const AGENT_OUTPUT_ARTIFACT: &str = "agent_output.json";
pub const COLLECT_STEP_ID: &str = "collect_output";

const OUTPUTS_DIR: &str = "/tmp/gh-aw/safeoutputs";
const DEFAULT_TOKEN: &str = "${{ secrets.GH_AW_GITHUB_TOKEN || secrets.GITHUB_TOKEN }}";

/// Compile-wide settings that affect the output jobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct WiringOptions<'a> {
    /// Repository every handler targets instead of the current one.
    pub trial_repo: Option<&'a str>,
    /// Workflow-level `github-token`.
    pub github_token: Option<&'a str>,
    /// Agent job id the output jobs depend on.
    pub agent_job: &'a str,
}

/// Env added to the agent job.
pub fn agent_env(outputs: &SafeOutputs) -> BTreeMap<String, Value> {
    let mut env = BTreeMap::new();
    env.insert("GH_AW_SAFE_OUTPUTS".to_string(), Value::from(OUTPUTS_PATH));
    env.insert(
        "GH_AW_SAFE_OUTPUTS_CONFIG".to_string(),
        Value::from(outputs.config_json()),
    );
    env
}

/// Step run before the agent so the output file exists.
pub fn setup_step() -> Step {
    Step::run(
        "Setup Safe Outputs",
        format!("mkdir -p {}\ntouch \"$GH_AW_SAFE_OUTPUTS\"\n", OUTPUTS_DIR),
    )
}

/// Steps run after the agent: validate the output and upload it.
pub fn collect_steps() -> Vec<Step> {
    let collect = runtime::script_step("Ingest agent output", "collect_ndjson_output")
        .with_id(COLLECT_STEP_ID)
        .with_env("GH_AW_SAFE_OUTPUTS", "${{ env.GH_AW_SAFE_OUTPUTS }}")
        .with_env("GH_AW_SAFE_OUTPUTS_CONFIG", "${{ env.GH_AW_SAFE_OUTPUTS_CONFIG }}")
        .with_env("GH_AW_AGENT_OUTPUT", AGENT_OUTPUT_PATH);

    let upload = Step::uses("Upload safe output", "actions/upload-artifact@v4")
        .when("always()")
        .with_input("name", AGENT_OUTPUT_ARTIFACT)
        .with_input("path", AGENT_OUTPUT_PATH)
        .with_input("if-no-files-found", "warn");

    vec![collect, upload]
}

/// Outputs the agent job exposes to the output jobs.
pub fn agent_outputs() -> BTreeMap<String, String> {
    ["output", "output_types"]
        .into_iter()
        .map(|name| {
            (
                name.to_string(),
                format!("${{{{ steps.{}.outputs.{} }}}}", COLLECT_STEP_ID, name),
            )
        })
        .collect()
}

/// One job per declared kind, keyed by job id.
pub fn output_jobs(outputs: &SafeOutputs, options: &WiringOptions<'_>) -> BTreeMap<String, Job> {
    outputs
        .iter()
        .map(|(kind, config)| (kind.snake_case(), output_job(kind, config, outputs, options)))
        .collect()
}

fn output_job(
    kind: SafeOutputKind,
    config: &SafeOutputConfig,
    outputs: &SafeOutputs,
    options: &WiringOptions<'_>,
) -> Job {
    let job_id = kind.snake_case();
    let token = outputs
        .github_token
        .as_deref()
        .or(options.github_token)
        .unwrap_or(DEFAULT_TOKEN);

    let mut steps = vec![
        runtime::setup_scripts_step(),
        Step::uses("Download agent output artifact", "actions/download-artifact@v4")
            .with_input("name", AGENT_OUTPUT_ARTIFACT)
            .with_input("path", format!("{}/", OUTPUTS_DIR)),
    ];
    if kind.needs_checkout() {
        steps.push(
            Step::uses("Checkout repository", "actions/checkout@v4")
                .with_input("persist-credentials", false),
        );
    }

    let mut handler = runtime::script_step(handler_name(kind), &job_id)
        .with_id(job_id.as_str())
        .with_env("GH_AW_AGENT_OUTPUT", AGENT_OUTPUT_PATH)
        .with_input("github-token", token);
    for (option, value) in &config.options {
        handler = handler.with_env(option_env_name(kind, option), option_env_value(value));
    }
    if outputs.staged {
        handler = handler.with_env("GH_AW_SAFE_OUTPUTS_STAGED", "true");
    }
    if let Some(repo) = options.trial_repo {
        handler = handler.with_env("GH_AW_TARGET_REPO_SLUG", repo);
    }
    steps.push(handler);

    let job_outputs = kind
        .job_outputs()
        .iter()
        .map(|name| {
            (
                name.to_string(),
                format!("${{{{ steps.{}.outputs.{} }}}}", job_id, name),
            )
        })
        .collect();

    Job {
        needs: vec![options.agent_job.to_string()],
        condition: Some(format!(
            "!cancelled() && contains(needs.{}.outputs.output_types, '{}')",
            options.agent_job, job_id
        )),
        runs_on: Value::from("ubuntu-slim"),
        permissions: kind.permissions(),
        timeout_minutes: Some(10),
        outputs: job_outputs,
        steps,
        ..Job::default()
    }
}

fn handler_name(kind: SafeOutputKind) -> String {
    let words: Vec<String> = kind
        .as_str()
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    words.join(" ")
}

fn option_env_name(kind: SafeOutputKind, option: &str) -> String {
    format!("GH_AW_{}_{}", kind.snake_case(), option.replace('-', "_")).to_uppercase()
}

fn option_env_value(value: &Json) -> String {
    match value {
        Json::String(text) => text.clone(),
        Json::Array(items) => items
            .iter()
            .map(option_env_value)
            .collect::<Vec<_>>()
            .join(","),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}
