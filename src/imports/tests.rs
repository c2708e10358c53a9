//! Tests for import graph resolution.

use super::*;
use crate::error::CompileError;

fn root(loader: &VirtualLoader, path: &str) -> WorkflowDocument {
    let content = loader.load(Path::new(path)).unwrap();
    WorkflowDocument::parse(&content, path).unwrap()
}

fn resolve(loader: &VirtualLoader, path: &str) -> Result<ImportGraph> {
    let doc = root(loader, path);
    ImportResolver::new(loader, "wf").resolve(&doc)
}

#[test]
fn test_no_imports_gives_empty_graph() {
    let loader = VirtualLoader::new().with_file("wf/main.md", "---\non: push\n---\nHi\n");
    let graph = resolve(&loader, "wf/main.md").unwrap();
    assert!(graph.is_empty());
    assert_eq!(graph.root(), Path::new("wf/main.md"));
}

#[test]
fn test_merge_order_is_depth_first_post_order() {
    let loader = VirtualLoader::new()
        .with_file(
            "wf/main.md",
            "---\nimports:\n  - shared/a.md\n  - shared/c.md\n---\nMain\n",
        )
        .with_file("wf/shared/a.md", "---\nimports: [b.md]\n---\nA\n")
        .with_file("wf/shared/b.md", "B\n")
        .with_file("wf/shared/c.md", "C\n");

    let graph = resolve(&loader, "wf/main.md").unwrap();
    let order: Vec<&str> = graph.fragments().map(|f| f.display_path.as_str()).collect();
    assert_eq!(order, ["shared/b.md", "shared/a.md", "shared/c.md"]);
    assert_eq!(graph.edges().len(), 3);
}

#[test]
fn test_diamond_first_occurrence_wins() {
    let loader = VirtualLoader::new()
        .with_file(
            "wf/main.md",
            "---\nimports: [a.md, b.md]\n---\n",
        )
        .with_file("wf/a.md", "---\nimports: [common.md]\n---\nA\n")
        .with_file("wf/b.md", "---\nimports: [common.md]\n---\nB\n")
        .with_file("wf/common.md", "Common\n");

    let graph = resolve(&loader, "wf/main.md").unwrap();
    let order: Vec<&str> = graph.fragments().map(|f| f.display_path.as_str()).collect();
    assert_eq!(order, ["common.md", "a.md", "b.md"]);
    // Both edges into common.md are recorded even though it loads once.
    assert_eq!(graph.edges().len(), 4);
}

#[test]
fn test_two_node_cycle_names_both_files() {
    let loader = VirtualLoader::new()
        .with_file("wf/a.md", "---\nimports: [b.md]\n---\n")
        .with_file("wf/b.md", "---\nname: b\nimports: [a.md]\n---\n");

    let err = resolve(&loader, "wf/a.md").unwrap_err();
    match &err {
        CompileError::Cycle { cycle, location } => {
            assert_eq!(location.path, PathBuf::from("wf/b.md"));
            assert_eq!(location.line, 3);
            assert_eq!(
                cycle,
                &vec![
                    PathBuf::from("a.md"),
                    PathBuf::from("b.md"),
                    PathBuf::from("a.md")
                ]
            );
        }
        other => panic!("expected cycle error, got {:?}", other),
    }
    assert!(err
        .to_string()
        .ends_with("import cycle detected: a.md → b.md → a.md"));
}

#[test]
fn test_self_import_is_a_cycle() {
    let loader = VirtualLoader::new().with_file("wf/a.md", "---\nimports: [a.md]\n---\n");
    assert!(matches!(
        resolve(&loader, "wf/a.md"),
        Err(CompileError::Cycle { .. })
    ));
}

#[test]
fn test_fragment_declaring_trigger_is_forbidden() {
    let loader = VirtualLoader::new()
        .with_file("wf/main.md", "---\non: issues\nimports: [shared/a.md]\n---\n")
        .with_file("wf/shared/a.md", "---\non: push\n---\n");

    match resolve(&loader, "wf/main.md").unwrap_err() {
        CompileError::ForbiddenField {
            field, fragment, ..
        } => {
            assert_eq!(field, "on");
            assert_eq!(fragment, PathBuf::from("wf/shared/a.md"));
        }
        other => panic!("expected forbidden field error, got {:?}", other),
    }
}

#[test]
fn test_missing_import_points_at_imports_key() {
    let loader =
        VirtualLoader::new().with_file("wf/main.md", "---\non: push\nimports: [nope.md]\n---\n");

    match resolve(&loader, "wf/main.md").unwrap_err() {
        CompileError::Parse {
            kind,
            location,
            message,
        } => {
            assert_eq!(kind, crate::error::ParseErrorKind::MissingImport);
            assert_eq!(location.line, 3);
            assert!(message.contains("nope.md"));
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn test_root_relative_import() {
    let loader = VirtualLoader::new()
        .with_file("wf/team/main.md", "---\nimports: [/shared/a.md]\n---\n")
        .with_file("wf/shared/a.md", "A\n");

    let graph = resolve(&loader, "wf/team/main.md").unwrap();
    assert_eq!(graph.merge_order(), [PathBuf::from("wf/shared/a.md")]);
}

#[test]
fn test_parent_relative_import() {
    let loader = VirtualLoader::new()
        .with_file("wf/team/main.md", "---\nimports: [../shared/a.md]\n---\n")
        .with_file("wf/shared/a.md", "A\n");

    let graph = resolve(&loader, "wf/team/main.md").unwrap();
    assert!(graph.get(Path::new("wf/shared/a.md")).is_some());
}

#[test]
fn test_section_import_selects_body_part() {
    let loader = VirtualLoader::new()
        .with_file("wf/main.md", "---\nimports: [\"style.md#Tone\"]\n---\nMain\n")
        .with_file("wf/style.md", "## Tone\nBe kind.\n## Other\nSkip.\n");

    let graph = resolve(&loader, "wf/main.md").unwrap();
    let fragment = graph.fragments().next().unwrap();
    assert_eq!(fragment.section.as_deref(), Some("Tone"));
    assert_eq!(fragment.body, "## Tone\nBe kind.\n");
}

#[test]
fn test_missing_section_is_configuration_error() {
    let loader = VirtualLoader::new()
        .with_file("wf/main.md", "---\nimports: [\"style.md#Nope\"]\n---\n")
        .with_file("wf/style.md", "## Tone\nBe kind.\n");

    assert!(matches!(
        resolve(&loader, "wf/main.md"),
        Err(CompileError::Configuration { .. })
    ));
}

#[test]
fn test_compose_prompt_reference_and_inline() {
    let loader = VirtualLoader::new()
        .with_file("wf/main.md", "---\nimports: [shared/a.md, shared/empty.md]\n---\n\nMain task.\n")
        .with_file("wf/shared/a.md", "---\ntools:\n  bash: [ls]\n---\nShared text.\n")
        .with_file("wf/shared/empty.md", "---\nnetwork: defaults\n---\n");

    let doc = root(&loader, "wf/main.md");
    let graph = ImportResolver::new(&loader, "wf").resolve(&doc).unwrap();

    assert_eq!(
        compose_prompt(&graph, &doc, false),
        "{{#runtime-import shared/a.md}}\n\nMain task.\n"
    );
    assert_eq!(
        compose_prompt(&graph, &doc, true),
        "Shared text.\n\nMain task.\n"
    );
}
