//! CLI argument parsing for awc.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// awc: compile markdown agentic workflows into GitHub Actions workflows.
///
/// Each `<name>.md` workflow (YAML frontmatter plus a prompt body) compiles
/// to `<name>.lock.yml` next to it.
#[derive(Parser, Debug)]
#[command(name = "awc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). `AWC_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Repository root holding `.github/awc.yaml`.
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for awc.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile workflows to lock files.
    ///
    /// With no paths, compiles every `*.md` directly inside the configured
    /// workflows directory.
    Compile(CompileArgs),

    /// Check workflows without writing lock files.
    Validate(CompileArgs),

    /// List the available engines.
    Engines,
}

/// Arguments shared by `compile` and `validate`.
#[derive(Parser, Debug, Default)]
pub struct CompileArgs {
    /// Workflow files to compile.
    pub paths: Vec<PathBuf>,

    /// Engine overriding the frontmatter `engine`.
    #[arg(long)]
    pub engine: Option<String>,

    /// Reject write permissions on the agent job.
    #[arg(long)]
    pub strict: bool,

    /// Copy imported fragment bodies into the prompt.
    #[arg(long)]
    pub inline_prompt: bool,

    /// Skip the frontmatter JSON schema pass.
    #[arg(long)]
    pub skip_validation: bool,

    /// Compile without writing lock files.
    #[arg(long)]
    pub no_emit: bool,

    /// Seed for fuzzy schedules (defaults to the file stem).
    #[arg(long)]
    pub workflow_id: Option<String>,

    /// Target every safe output at this repository (`owner/repo`).
    #[arg(long, value_name = "OWNER/REPO")]
    pub trial_repo: Option<String>,

    /// Recompute relative stop-after deadlines.
    #[arg(long)]
    pub refresh_stop_time: bool,

    /// Stop at the first failing workflow.
    #[arg(long)]
    pub fail_fast: bool,

    /// Maximum workflows compiled at once.
    #[arg(short = 'j', long)]
    pub max_parallel: Option<usize>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
