//! Tests for command handlers.

use super::compile::cmd_compile;
use super::engines::describe;
use super::*;
use crate::cli::CompileArgs;
use crate::config::CompilerConfig;
use crate::engine::EngineRegistry;
use crate::exit_codes;
use std::fs;
use std::path::Path;

const WORKFLOW: &str = "---\non: push\n---\nSummarize recent commits.\n";

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_discover_skips_fragments_and_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let workflows = dir.path().join(".github/workflows");
    write(&workflows.join("b.md"), WORKFLOW);
    write(&workflows.join("a.md"), WORKFLOW);
    write(&workflows.join("draft.wip.md"), WORKFLOW);
    write(&workflows.join("notes.txt"), "x");
    write(&workflows.join("shared/tone.md"), "Be brief.\n");

    let config = CompilerConfig {
        ignore: vec!["*.wip.md".to_string()],
        ..CompilerConfig::default()
    };
    let found = discover_workflows(&config, dir.path()).unwrap();
    assert_eq!(found, vec![workflows.join("a.md"), workflows.join("b.md")]);
}

#[test]
fn test_discover_missing_dir_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let found = discover_workflows(&CompilerConfig::default(), dir.path()).unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_flags_override_config() {
    let config = CompilerConfig {
        default_engine: Some("claude".to_string()),
        inline_prompt: true,
        ..CompilerConfig::default()
    };
    let args = CompileArgs {
        engine: Some("copilot".to_string()),
        strict: true,
        ..CompileArgs::default()
    };

    let options = compile_options(&args, &config, Path::new("repo"), false);
    assert!(options.no_emit);
    assert!(options.strict);
    assert!(options.inline_prompt);
    assert_eq!(options.engine_override.as_deref(), Some("copilot"));
    assert_eq!(options.default_engine.as_deref(), Some("claude"));
    assert_eq!(options.import_root.as_deref(), Some(Path::new("repo")));
}

#[test]
fn test_compile_writes_lock_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join(".github/workflows/digest.md");
    write(&source, WORKFLOW);

    let code = cmd_compile(dir.path(), &CompileArgs::default(), true).unwrap();
    assert_eq!(code, exit_codes::SUCCESS);
    assert!(dir.path().join(".github/workflows/digest.lock.yml").exists());
}

#[test]
fn test_validate_reports_failure_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join(".github/workflows/broken.md");
    write(&source, "---\nname: no triggers\n---\nBody\n");

    let code = cmd_compile(dir.path(), &CompileArgs::default(), false).unwrap();
    assert_eq!(code, exit_codes::COMPILE_FAILURE);
    assert!(!dir.path().join(".github/workflows/broken.lock.yml").exists());
}

#[test]
fn test_invalid_project_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir.path().join(".github/awc.yaml"), "max_parallel: 0\n");

    let err = cmd_compile(dir.path(), &CompileArgs::default(), true).unwrap_err();
    assert!(format!("{:#}", err).contains("max_parallel"));
}

#[test]
fn test_engine_listing_line() {
    let registry = EngineRegistry::with_builtin_engines();
    let line = describe(registry.get("claude").unwrap());
    assert!(line.starts_with("claude "));
    assert!(line.contains("ANTHROPIC_API_KEY"));
}
