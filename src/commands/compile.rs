//! Implementation of the `awc compile` and `awc validate` commands.
//!
//! 1. Load `.github/awc.yaml` (defaults when absent)
//! 2. Collect workflows: the given paths, or every `*.md` directly inside
//!    `workflows_dir` not matched by `ignore`
//! 3. Compile them in parallel (`validate` never writes)
//! 4. Print one diagnostic per failing workflow and a summary

use crate::batch::{self, BatchOptions};
use crate::cli::CompileArgs;
use crate::compiler::{CompileOptions, Compiler};
use crate::config::{CONFIG_FILE, CompilerConfig};
use crate::diagnostic;
use crate::engine::EngineRegistry;
use crate::exit_codes;
use anyhow::Context;
use std::path::{Path, PathBuf};

pub fn cmd_compile(root: &Path, args: &CompileArgs, emit: bool) -> anyhow::Result<i32> {
    let config = CompilerConfig::discover(root)
        .with_context(|| format!("invalid project config '{}'", root.join(CONFIG_FILE).display()))?;

    let paths = if args.paths.is_empty() {
        discover_workflows(&config, root)?
    } else {
        args.paths.clone()
    };
    if paths.is_empty() {
        println!(
            "No workflows found in {}",
            config.workflows_path(root).display()
        );
        return Ok(exit_codes::SUCCESS);
    }

    let registry = EngineRegistry::with_builtin_engines();
    let compiler = Compiler::new(&registry, compile_options(args, &config, root, emit));
    let batch_options = BatchOptions {
        max_parallel: args.max_parallel.unwrap_or(config.max_parallel),
        fail_fast: args.fail_fast || config.fail_fast,
    };
    let report = batch::compile_all(&compiler, &paths, &batch_options)?;

    for (_, err) in report.failures() {
        eprint!(
            "{}",
            diagnostic::render_error(err, |path| std::fs::read_to_string(path).ok())
        );
    }
    for doc in &report.documents {
        if let Ok(outcome) = &doc.result
            && outcome.written
        {
            println!("{} -> {}", doc.source.display(), outcome.lock_path.display());
        }
    }

    let failed = report.documents.len() - report.succeeded();
    let verb = if compiler.options().no_emit {
        "Validated"
    } else {
        "Compiled"
    };
    println!(
        "{} {} workflow(s), {} failed{}",
        verb,
        report.succeeded(),
        failed,
        if report.skipped.is_empty() {
            String::new()
        } else {
            format!(", {} skipped", report.skipped.len())
        }
    );

    Ok(report.exit_code())
}

/// Merge CLI flags over project config. Flags only ever switch options on.
pub fn compile_options(
    args: &CompileArgs,
    config: &CompilerConfig,
    root: &Path,
    emit: bool,
) -> CompileOptions {
    CompileOptions {
        no_emit: args.no_emit || !emit,
        skip_validation: args.skip_validation,
        workflow_id: args.workflow_id.clone(),
        inline_prompt: args.inline_prompt || config.inline_prompt,
        strict: args.strict || config.strict,
        engine_override: args.engine.clone(),
        default_engine: config.default_engine.clone(),
        trial_repo: args.trial_repo.clone(),
        refresh_stop_time: args.refresh_stop_time,
        now: None,
        import_root: Some(root.to_path_buf()),
    }
}

/// Every `*.md` directly inside the workflows directory, sorted, minus
/// ignored files. Subdirectories hold shared fragments and are not scanned.
pub fn discover_workflows(config: &CompilerConfig, root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let dir = config.workflows_path(root);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let ignore = config.ignore_set()?;

    let entries = std::fs::read_dir(&dir)
        .with_context(|| format!("failed to list workflows in '{}'", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to list workflows in '{}'", dir.display()))?
            .path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "md") {
            continue;
        }
        let relative = path.strip_prefix(&dir).unwrap_or(&path);
        if ignore.is_ignored(relative) {
            tracing::debug!(path = %path.display(), "ignored by config");
            continue;
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}
