//! Tests for engine selection and adapters.

use super::*;
use std::collections::BTreeMap;

fn registry() -> EngineRegistry {
    EngineRegistry::with_builtin_engines()
}

fn context<'a>(
    selection: &'a EngineSelection,
    tools: &'a ToolSet,
    servers: &'a [McpServer],
    domains: &'a [String],
) -> EngineContext<'a> {
    EngineContext {
        selection,
        tools,
        mcp_servers: servers,
        allowed_domains: domains,
        prompt_path: PROMPT_PATH,
    }
}

fn script(step: &Step) -> &str {
    step.run.as_deref().unwrap_or("")
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn test_registry_lists_builtin_engines_in_order() {
    assert_eq!(
        registry().ids(),
        ["copilot", "copilot-sdk", "claude", "custom"]
    );
}

#[test]
fn test_is_valid_engine() {
    let registry = registry();
    assert!(registry.is_valid_engine("claude"));
    assert!(registry.is_valid_engine("copilot-sdk"));
    assert!(!registry.is_valid_engine("Claude"));
    assert!(!registry.is_valid_engine("gpt4"));
}

#[test]
fn test_unknown_engine_suggests_closest_names() {
    let err = registry().get("gpt4").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Did you mean 'custom'"), "{}", message);
    assert_eq!(err.suggestions().first().map(String::as_str), Some("custom"));
    assert!(err.suggestions().len() <= suggest_limit());
}

#[test]
fn test_typo_suggests_single_best_match_first() {
    let err = registry().get("claud").unwrap_err();
    assert_eq!(err.suggestions()[0], "claude");
}

fn suggest_limit() -> usize {
    crate::suggest::MAX_SUGGESTIONS
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_selection_defaults_to_copilot() {
    let selection = resolve_selection(&registry(), None, None, None).unwrap();
    assert_eq!(selection.id, EngineId::Copilot);
    assert_eq!(selection.source, Some(SelectionSource::Builtin));
}

#[test]
fn test_selection_uses_frontmatter_settings() {
    let mut config = EngineConfig::with_id("claude");
    config.model = Some("claude-sonnet-4".to_string());
    config.max_turns = Some(5);

    let selection = resolve_selection(&registry(), Some(&config), None, Some("copilot")).unwrap();
    assert_eq!(selection.id, EngineId::Claude);
    assert_eq!(selection.model.as_deref(), Some("claude-sonnet-4"));
    assert_eq!(selection.max_turns, Some(5));
    assert_eq!(selection.source, Some(SelectionSource::Frontmatter));
}

#[test]
fn test_config_default_applies_without_frontmatter() {
    let selection = resolve_selection(&registry(), None, None, Some("claude")).unwrap();
    assert_eq!(selection.id, EngineId::Claude);
    assert_eq!(selection.source, Some(SelectionSource::ConfigDefault));
}

#[test]
fn test_override_to_other_engine_drops_settings() {
    let mut config = EngineConfig::with_id("claude");
    config.model = Some("claude-sonnet-4".to_string());

    let selection =
        resolve_selection(&registry(), Some(&config), Some("copilot"), None).unwrap();
    assert_eq!(selection.id, EngineId::Copilot);
    assert_eq!(selection.model, None);
    assert_eq!(selection.source, Some(SelectionSource::Override));
}

#[test]
fn test_override_to_same_engine_keeps_settings() {
    let mut config = EngineConfig::with_id("claude");
    config.model = Some("claude-sonnet-4".to_string());

    let selection = resolve_selection(&registry(), Some(&config), Some("claude"), None).unwrap();
    assert_eq!(selection.model.as_deref(), Some("claude-sonnet-4"));
}

#[test]
fn test_unknown_override_fails() {
    let err = resolve_selection(&registry(), None, Some("gpt4"), None).unwrap_err();
    assert!(err.to_string().contains("Did you mean 'custom'"));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_copilot_rejects_max_turns() {
    let selection = EngineSelection {
        max_turns: Some(3),
        ..EngineSelection::default()
    };
    assert!(CopilotEngine.validate(&selection).is_err());
    assert!(ClaudeEngine.validate(&selection).is_ok());
}

#[test]
fn test_hosted_engines_reject_steps() {
    let selection = EngineSelection {
        steps: vec![serde_yaml::from_str("run: echo hi").unwrap()],
        ..EngineSelection::default()
    };
    let err = ClaudeEngine.validate(&selection).unwrap_err();
    assert!(err.to_string().contains("use engine 'custom'"));
}

#[test]
fn test_custom_requires_steps() {
    let selection = EngineSelection {
        id: EngineId::Custom,
        ..EngineSelection::default()
    };
    let err = CustomEngine.validate(&selection).unwrap_err();
    assert!(err.to_string().contains("engine.steps"));
}

// ============================================================================
// Steps
// ============================================================================

#[test]
fn test_copilot_installs_pinned_cli() {
    let selection = EngineSelection::default();
    let tools = ToolSet::default();
    let ctx = context(&selection, &tools, &[], &[]);

    let steps = CopilotEngine.installation_steps(&ctx).unwrap();
    assert_eq!(steps[0].env["COPILOT_GITHUB_TOKEN"], Value::from("${{ secrets.COPILOT_GITHUB_TOKEN }}"));
    assert_eq!(steps[1].uses.as_deref(), Some("actions/setup-node@v4"));
    assert_eq!(script(&steps[2]), "npm install -g @github/copilot@0.0.354\n");
}

#[test]
fn test_version_pin_overrides_default() {
    let selection = EngineSelection {
        id: EngineId::Claude,
        version: Some("1.0.0".to_string()),
        ..EngineSelection::default()
    };
    let tools = ToolSet::default();
    let ctx = context(&selection, &tools, &[], &[]);

    let steps = ClaudeEngine.installation_steps(&ctx).unwrap();
    assert!(steps.iter().any(|s| script(s).contains("@anthropic-ai/claude-code@1.0.0")));
}

#[test]
fn test_copilot_execution_sets_model_and_tools() {
    let selection = EngineSelection {
        model: Some("gpt-5".to_string()),
        ..EngineSelection::default()
    };
    let tools = ToolSet {
        bash: Some(tools::BashTool::Commands(vec!["ls".to_string()])),
        ..ToolSet::default()
    };
    let servers = mcp::collect_servers(&tools, &BTreeMap::new(), true).unwrap();
    let domains = vec!["api.github.com".to_string(), "pypi.org".to_string()];
    let ctx = context(&selection, &tools, &servers, &domains);

    let steps = CopilotEngine.execution_steps(&ctx).unwrap();
    let step = &steps[0];
    let run = script(step);
    assert_eq!(step.id.as_deref(), Some("agentic_execution"));
    assert!(run.contains("--allow-tool 'shell(ls)'"), "{}", run);
    assert!(run.contains("--allow-tool github"));
    assert!(run.contains("--allow-tool safeoutputs"));
    assert!(run.contains("--additional-mcp-config @/tmp/gh-aw/mcp-config/mcp-servers.json"));
    assert!(run.contains("--prompt \"$(cat /tmp/gh-aw/aw-prompts/prompt.txt)\""));
    assert_eq!(step.env["COPILOT_MODEL"], Value::from("gpt-5"));
    assert_eq!(step.env["GH_AW_ALLOWED_DOMAINS"], Value::from("api.github.com,pypi.org"));
    assert!(step.env.contains_key("GH_AW_SAFE_OUTPUTS"));
}

#[test]
fn test_copilot_sdk_runs_bundled_runner() {
    let selection = EngineSelection {
        id: EngineId::CopilotSdk,
        max_turns: Some(3),
        ..EngineSelection::default()
    };
    let tools = ToolSet::default();
    let servers = mcp::collect_servers(&tools, &BTreeMap::new(), false).unwrap();
    let ctx = context(&selection, &tools, &servers, &[]);

    let steps = CopilotSdkEngine.execution_steps(&ctx).unwrap();
    let run = script(&steps[0]);
    assert_eq!(run, "node /tmp/gh-aw/actions/copilot_sdk_runner.cjs\n");
    assert!(run.contains(&crate::runtime::script_path("copilot_sdk_runner")));
    assert_eq!(steps[0].env["GH_AW_MAX_TURNS"], Value::from("3"));
}

#[test]
fn test_claude_execution_passes_max_turns_and_quoted_args() {
    let selection = EngineSelection {
        id: EngineId::Claude,
        max_turns: Some(7),
        args: vec!["--append-system-prompt".to_string(), "be brief".to_string()],
        ..EngineSelection::default()
    };
    let tools = ToolSet {
        edit: true,
        ..ToolSet::default()
    };
    let servers = mcp::collect_servers(&tools, &BTreeMap::new(), false).unwrap();
    let ctx = context(&selection, &tools, &servers, &[]);

    let steps = ClaudeEngine.execution_steps(&ctx).unwrap();
    let run = script(&steps[0]);
    assert!(run.contains("--max-turns 7"));
    assert!(run.contains("--append-system-prompt 'be brief'"));
    assert!(run.contains("mcp__github"));
    assert!(run.contains("MultiEdit"));
    assert!(!steps[0].env.contains_key("ANTHROPIC_MODEL"));
}

#[test]
fn test_mcp_config_step_writes_heredoc() {
    let selection = EngineSelection::default();
    let tools = ToolSet::default();
    let servers = mcp::collect_servers(&tools, &BTreeMap::new(), false).unwrap();
    let ctx = context(&selection, &tools, &servers, &[]);

    let steps = CopilotEngine.mcp_config_steps(&ctx);
    assert_eq!(steps.len(), 1);
    let run = script(&steps[0]);
    assert!(run.starts_with("mkdir -p /tmp/gh-aw/mcp-config\ncat > /tmp/gh-aw/mcp-config/mcp-servers.json << 'EOF'\n"));
    assert!(run.ends_with("\nEOF\n"));
    assert!(run.contains("\"mcpServers\""));
}

#[test]
fn test_no_servers_means_no_mcp_step() {
    let selection = EngineSelection::default();
    let tools = ToolSet {
        github: None,
        ..ToolSet::default()
    };
    let ctx = context(&selection, &tools, &[], &[]);
    assert!(ClaudeEngine.mcp_config_steps(&ctx).is_empty());
}

#[test]
fn test_custom_engine_emits_user_steps() {
    let selection = EngineSelection {
        id: EngineId::Custom,
        steps: vec![
            serde_yaml::from_str("name: Run agent\nrun: ./agent.sh\n").unwrap(),
            serde_yaml::from_str("uses: ./actions/report\nenv:\n  GH_AW_PROMPT: custom.txt\n").unwrap(),
        ],
        env: [("MODE".to_string(), "ci".to_string())].into_iter().collect(),
        ..EngineSelection::default()
    };
    let tools = ToolSet::default();
    let ctx = context(&selection, &tools, &[], &[]);

    assert!(CustomEngine.installation_steps(&ctx).unwrap().is_empty());
    let steps = CustomEngine.execution_steps(&ctx).unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].run.as_deref(), Some("./agent.sh"));
    assert_eq!(steps[0].env["GH_AW_PROMPT"], Value::from(PROMPT_PATH));
    assert_eq!(steps[0].env["MODE"], Value::from("ci"));
    assert_eq!(steps[1].env["GH_AW_PROMPT"], Value::from("custom.txt"));
}

#[test]
fn test_custom_step_without_action_fails() {
    let selection = EngineSelection {
        id: EngineId::Custom,
        steps: vec![serde_yaml::from_str("name: nothing\n").unwrap()],
        ..EngineSelection::default()
    };
    let tools = ToolSet::default();
    let ctx = context(&selection, &tools, &[], &[]);
    assert!(CustomEngine.execution_steps(&ctx).is_err());
}

#[test]
fn test_engine_id_round_trip() {
    for id in EngineId::ALL {
        assert_eq!(EngineId::parse(id.as_str()), Some(id));
    }
    assert_eq!(EngineId::parse("codex"), None);
}
