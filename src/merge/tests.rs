//! Tests for frontmatter merging.

use super::*;
use crate::frontmatter::{EngineConfig, WorkflowDocument};
use crate::permissions::{PermissionLevel, PermissionScope};
use serde_yaml::Value;

fn fm(yaml: &str) -> Frontmatter {
    WorkflowDocument::parse(&format!("---\n{}---\n", yaml), "wf.md")
        .unwrap()
        .frontmatter
}

#[test]
fn test_root_scalar_wins() {
    let root = fm("engine: claude\n");
    let shared = fm("engine: copilot\nname: Shared\n");

    let merged = merge_frontmatter(&root, &[&shared]);
    assert_eq!(merged.engine, Some(EngineConfig::with_id("claude")));
    assert_eq!(merged.name.as_deref(), Some("Shared"));
}

#[test]
fn test_first_fragment_scalar_wins_when_root_unset() {
    let root = fm("on: push\n");
    let first = fm("engine: claude\n");
    let second = fm("engine: custom\n");

    let merged = merge_frontmatter(&root, &[&first, &second]);
    assert_eq!(merged.engine.unwrap().id, "claude");
}

#[test]
fn test_permissions_write_wins() {
    let root = fm("permissions:\n  issues: write\n");
    let shared = fm("permissions:\n  issues: read\n  contents: read\n");

    let merged = merge_frontmatter(&root, &[&shared]);
    let perms = merged.permissions.unwrap();
    assert_eq!(perms.get(PermissionScope::Issues), Some(PermissionLevel::Write));
    assert_eq!(perms.get(PermissionScope::Contents), Some(PermissionLevel::Read));
}

#[test]
fn test_permissions_absent_everywhere_stays_none() {
    let merged = merge_frontmatter(&fm("on: push\n"), &[&fm("tools:\n  bash: [ls]\n")]);
    assert!(merged.permissions.is_none());
}

#[test]
fn test_network_allowed_union_fragments_first() {
    let root = fm("network:\n  allowed: [example.com, defaults]\n");
    let shared = fm("network:\n  allowed: [defaults, python]\n");

    let merged = merge_frontmatter(&root, &[&shared]);
    assert_eq!(
        merged.network.unwrap().allowed,
        vec!["defaults", "python", "example.com"]
    );
}

#[test]
fn test_bash_commands_union() {
    let root = fm("tools:\n  bash: [ls, cat]\n");
    let shared = fm("tools:\n  bash: [cat, grep]\n  edit:\n");

    let merged = merge_frontmatter(&root, &[&shared]);
    let bash: Vec<&str> = merged.tools["bash"]
        .as_sequence()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(bash, ["cat", "grep", "ls"]);
    assert!(merged.tools.contains_key("edit"));
}

#[test]
fn test_keyed_map_root_overrides_scalar_leaf() {
    let root = fm("safe-outputs:\n  create-issue:\n    max: 5\n");
    let shared = fm("safe-outputs:\n  create-issue:\n    max: 1\n    title-prefix: \"[bot] \"\n  add-comment:\n");

    let merged = merge_frontmatter(&root, &[&shared]);
    let issue = &merged.safe_outputs["create-issue"];
    assert_eq!(issue["max"].as_u64(), Some(5));
    assert_eq!(issue["title-prefix"], Value::from("[bot] "));
    assert!(merged.safe_outputs.contains_key("add-comment"));
}

#[test]
fn test_env_per_key_override() {
    let root = fm("env:\n  LEVEL: root\n");
    let shared = fm("env:\n  LEVEL: shared\n  EXTRA: \"1\"\n");

    let merged = merge_frontmatter(&root, &[&shared]);
    assert_eq!(merged.env["LEVEL"], Value::from("root"));
    assert_eq!(merged.env["EXTRA"], Value::from("1"));
}

#[test]
fn test_steps_union_fragments_first() {
    let root = fm("steps:\n  - run: echo root\n");
    let shared = fm("steps:\n  - run: echo shared\n  - run: echo root\n");

    let merged = merge_frontmatter(&root, &[&shared]);
    assert_eq!(merged.steps.len(), 2);
    assert_eq!(merged.steps[0]["run"], Value::from("echo shared"));
}

#[test]
fn test_merge_is_stable_when_repeated() {
    let root = fm("permissions: read-all\ntools:\n  bash: [ls]\n");
    let shared = fm("permissions:\n  issues: write\ntools:\n  bash: [cat]\n");

    let once = merge_frontmatter(&root, &[&shared]);
    let twice = merge_frontmatter(&once, &[&shared]);
    assert_eq!(once, twice);
}
