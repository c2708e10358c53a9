//! awc: compiles markdown agentic workflows into GitHub Actions workflows.
//!
//! A workflow is a markdown file whose YAML frontmatter configures triggers,
//! permissions, the AI engine, tools and safe outputs, and whose body is the
//! agent's prompt. [`compiler::Compiler`] turns one such file (plus the
//! fragments it imports) into a `.lock.yml` workflow; [`batch`] runs many
//! compiles in parallel.

pub mod batch;
pub mod cli;
pub mod commands;
pub mod compiler;
pub mod config;
pub mod diagnostic;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod exit_codes;
pub mod frontmatter;
pub mod fs;
pub mod imports;
pub mod logging;
pub mod merge;
pub mod permissions;
pub mod runtime;
pub mod safe_outputs;
pub mod suggest;

pub use compiler::{CompileOptions, CompileOutcome, Compiler};
pub use engine::EngineRegistry;
pub use error::{CompileError, Result, SourceLocation};
