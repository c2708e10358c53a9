//! Entry point for the `awc` CLI. It parses arguments, dispatches to the
//! command handler, and maps errors to exit codes.

use awc::cli::Cli;
use awc::error::CompileError;
use awc::{commands, exit_codes, logging};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    logging::init(cli.verbose);

    match commands::dispatch(cli) {
        Ok(code) => ExitCode::from(code as u8),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {:#}", err);

            let code = err
                .downcast_ref::<CompileError>()
                .map(CompileError::exit_code)
                .unwrap_or(exit_codes::USER_ERROR);
            ExitCode::from(code as u8)
        }
    }
}
