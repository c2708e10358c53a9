//! Tests for config functionality.

use crate::config::{CONFIG_FILE, CompilerConfig, ConfigError, IgnoreSet};
use std::path::Path;

#[test]
fn test_default_config() {
    let config = CompilerConfig::default();

    assert_eq!(config.workflows_dir, ".github/workflows");
    assert!(config.ignore.is_empty());
    assert_eq!(config.default_engine, None);
    assert!(!config.strict);
    assert!(!config.inline_prompt);
    assert_eq!(config.max_parallel, 4);
    assert!(!config.fail_fast);
}

#[test]
fn test_parse_minimal_yaml() {
    let config = CompilerConfig::from_yaml("").unwrap();
    assert_eq!(config, CompilerConfig::default());
}

#[test]
fn test_parse_partial_yaml() {
    let yaml = r#"
default_engine: claude
strict: true
"#;
    let config = CompilerConfig::from_yaml(yaml).unwrap();

    assert_eq!(config.default_engine.as_deref(), Some("claude"));
    assert!(config.strict);

    // Unspecified values use defaults
    assert_eq!(config.workflows_dir, ".github/workflows");
    assert_eq!(config.max_parallel, 4);
}

#[test]
fn test_parse_full_yaml() {
    let yaml = r#"
workflows_dir: agents
ignore:
  - "drafts/*.md"
  - "*.wip.md"
default_engine: copilot
strict: true
inline_prompt: true
max_parallel: 8
fail_fast: true
"#;
    let config = CompilerConfig::from_yaml(yaml).unwrap();

    assert_eq!(config.workflows_dir, "agents");
    assert_eq!(config.ignore.len(), 2);
    assert!(config.inline_prompt);
    assert_eq!(config.max_parallel, 8);
    assert!(config.fail_fast);
}

#[test]
fn test_parse_yaml_with_unknown_fields() {
    // Unknown fields are ignored for forward compatibility
    let yaml = r#"
max_parallel: 2
future_feature_x: enabled
another_unknown:
  nested: true
"#;
    let config = CompilerConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.max_parallel, 2);
}

#[test]
fn test_validate_zero_max_parallel() {
    let err = CompilerConfig::from_yaml("max_parallel: 0").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("max_parallel"));
}

#[test]
fn test_validate_empty_workflows_dir() {
    let err = CompilerConfig::from_yaml("workflows_dir: \"  \"").unwrap_err();
    assert!(err.to_string().contains("workflows_dir"));
}

#[test]
fn test_validate_unknown_default_engine() {
    let err = CompilerConfig::from_yaml("default_engine: claud").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("default_engine 'claud'"));
    assert!(message.contains("Did you mean 'claude'"));
}

#[test]
fn test_validate_invalid_ignore_glob() {
    let err = CompilerConfig::from_yaml("ignore: [\"drafts/[\"]").unwrap_err();
    assert!(err.to_string().contains("invalid ignore pattern"));
}

#[test]
fn test_malformed_yaml_is_parse_error() {
    let err = CompilerConfig::from_yaml("max_parallel: [").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_ignore_set_matches_relative_paths() {
    let set = IgnoreSet::new(&["drafts/*.md".to_string(), "*.wip.md".to_string()]).unwrap();
    assert!(set.is_ignored(Path::new("drafts/idea.md")));
    assert!(set.is_ignored(Path::new("triage.wip.md")));
    assert!(!set.is_ignored(Path::new("triage.md")));

    assert!(!IgnoreSet::default().is_ignored(Path::new("anything.md")));
}

#[test]
fn test_to_yaml() {
    let config = CompilerConfig {
        default_engine: Some("claude".to_string()),
        ..CompilerConfig::default()
    };
    let yaml = config.to_yaml().unwrap();

    // Should be valid YAML that can be parsed back
    let parsed = CompilerConfig::from_yaml(&yaml).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_config_load_from_file() {
    use std::io::Write;
    use tempfile::NamedTempFile;

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "max_parallel: 7").unwrap();
    writeln!(file, "workflows_dir: flows").unwrap();

    let config = CompilerConfig::load(file.path()).unwrap();
    assert_eq!(config.max_parallel, 7);
    assert_eq!(config.workflows_dir, "flows");
}

#[test]
fn test_config_load_missing_file() {
    let err = CompilerConfig::load("/nonexistent/path/awc.yaml").unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}

#[test]
fn test_discover_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = CompilerConfig::discover(dir.path()).unwrap();
    assert_eq!(config, CompilerConfig::default());

    let path = dir.path().join(CONFIG_FILE);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "inline_prompt: true\n").unwrap();
    let config = CompilerConfig::discover(dir.path()).unwrap();
    assert!(config.inline_prompt);
    assert_eq!(
        config.workflows_path(dir.path()),
        dir.path().join(".github/workflows")
    );
}
