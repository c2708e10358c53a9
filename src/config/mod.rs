//! Project configuration for awc.
//!
//! This module defines [`CompilerConfig`], the contents of the optional
//! `.github/awc.yaml`. Parsing is forward-compatible (unknown fields are
//! ignored), every field has a default, and values are validated on load.
//! Command-line flags override file settings.

mod model;
mod operations;
pub mod types;

#[cfg(test)]
mod tests;

pub use model::CompilerConfig;
pub use operations::ConfigError;
pub use types::{CONFIG_FILE, IgnoreSet};
