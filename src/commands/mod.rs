//! Command implementations for awc.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Handlers return the process exit code; errors that
//! abort a command before any workflow is compiled come back as `Err`.

mod compile;
mod engines;

#[cfg(test)]
mod tests;

pub use compile::{compile_options, discover_workflows};

use crate::cli::{Cli, Command};

/// Dispatch a command to its implementation.
pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Compile(args) => compile::cmd_compile(&cli.root, &args, true),
        Command::Validate(args) => compile::cmd_compile(&cli.root, &args, false),
        Command::Engines => engines::cmd_engines(),
    }
}
