//! Compile many documents on a bounded pool of worker threads.
//!
//! Workers are scoped threads pulling the next index from a shared counter,
//! so they borrow the compiler and the path list without reference counting.
//! Documents are keyed by their lock file path before anything is scheduled;
//! no two workers ever write the same file.

use crate::compiler::{CompileOutcome, Compiler, lock_path};
use crate::error::{CompileError, Result};
use crate::exit_codes;
use crate::imports::normalize_path;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub max_parallel: usize,
    /// Stop handing out documents after the first failure.
    pub fail_fast: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_parallel: 4,
            fail_fast: false,
        }
    }
}

/// Result for one document.
#[derive(Debug)]
pub struct DocumentReport {
    pub source: PathBuf,
    pub result: Result<CompileOutcome>,
}

/// Results in input order. Documents never started (after a fail-fast stop)
/// are listed in `skipped`.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub documents: Vec<DocumentReport>,
    pub skipped: Vec<PathBuf>,
}

impl BatchReport {
    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &CompileError)> {
        self.documents
            .iter()
            .filter_map(|doc| doc.result.as_ref().err().map(|err| (&doc.source, err)))
    }

    pub fn succeeded(&self) -> usize {
        self.documents.iter().filter(|doc| doc.result.is_ok()).count()
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// The most severe exit code among the failures.
    pub fn exit_code(&self) -> i32 {
        self.failures()
            .map(|(_, err)| err.exit_code())
            .max()
            .unwrap_or(exit_codes::SUCCESS)
    }
}

/// Drop repeated sources and reject distinct sources sharing a lock file.
pub fn plan(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut by_output: BTreeMap<PathBuf, PathBuf> = BTreeMap::new();
    let mut planned = Vec::with_capacity(paths.len());

    for path in paths {
        let source = normalize_path(path);
        let output = lock_path(&source);
        match by_output.get(&output) {
            Some(existing) if *existing == source => {
                warn!(path = %path.display(), "skipping duplicate workflow");
            }
            Some(existing) => {
                return Err(CompileError::configuration(format!(
                    "'{}' and '{}' both compile to '{}'",
                    existing.display(),
                    source.display(),
                    output.display()
                )));
            }
            None => {
                by_output.insert(output, source);
                planned.push(path.clone());
            }
        }
    }

    Ok(planned)
}

/// Compile every path with `compiler`.
///
/// # Errors
///
/// Fails before compiling anything when two sources share a lock file.
/// Per-document failures are collected in the report.
pub fn compile_all(
    compiler: &Compiler<'_>,
    paths: &[PathBuf],
    options: &BatchOptions,
) -> Result<BatchReport> {
    let items = plan(paths)?;
    let workers = options.max_parallel.max(1).min(items.len());
    info!(documents = items.len(), workers, "compiling workflows");

    let next = AtomicUsize::new(0);
    let stop = AtomicBool::new(false);
    let slots: Mutex<Vec<Option<Result<CompileOutcome>>>> =
        Mutex::new((0..items.len()).map(|_| None).collect());

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    if stop.load(Ordering::SeqCst) {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(path) = items.get(index) else {
                        break;
                    };

                    let result = compiler.compile_file(path);
                    match &result {
                        Ok(outcome) => info!(
                            path = %path.display(),
                            lock = %outcome.lock_path.display(),
                            written = outcome.written,
                            "compiled"
                        ),
                        Err(err) => {
                            warn!(path = %path.display(), error = %err, "compile failed");
                            if options.fail_fast {
                                stop.store(true, Ordering::SeqCst);
                            }
                        }
                    }

                    slots.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(result);
                }
            });
        }
    });

    let mut report = BatchReport::default();
    let slots = slots.into_inner().unwrap_or_else(PoisonError::into_inner);
    for (source, slot) in items.into_iter().zip(slots) {
        match slot {
            Some(result) => report.documents.push(DocumentReport { source, result }),
            None => report.skipped.push(source),
        }
    }

    info!(
        succeeded = report.succeeded(),
        failed = report.documents.len() - report.succeeded(),
        skipped = report.skipped.len(),
        "batch finished"
    );
    Ok(report)
}
