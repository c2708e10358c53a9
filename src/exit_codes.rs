//! Exit code constants for the awc CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, unreadable input, bad project config)
//! - 2: Compile failure (parse, schema, import, configuration errors)
//! - 3: Emission failure (lock file could not be written)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments, missing files, or invalid project configuration.
pub const USER_ERROR: i32 = 1;

/// Compile failure: at least one workflow failed to compile.
pub const COMPILE_FAILURE: i32 = 2;

/// Emission failure: the generated lock file could not be written.
pub const EMISSION_FAILURE: i32 = 3;
