//! CompilerConfig struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Project-wide compiler settings.
///
/// This struct represents the contents of `.github/awc.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    // =========================================================================
    // Discovery
    // =========================================================================
    /// Directory scanned when `compile` is given no paths.
    #[serde(default = "default_workflows_dir")]
    pub workflows_dir: String,

    /// Glob patterns (relative to `workflows_dir`) excluded from discovery.
    #[serde(default)]
    pub ignore: Vec<String>,

    // =========================================================================
    // Compilation
    // =========================================================================
    /// Engine used when a workflow does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_engine: Option<String>,

    /// Compile every workflow in strict mode.
    #[serde(default)]
    pub strict: bool,

    /// Copy imported fragment bodies into prompts instead of runtime imports.
    #[serde(default)]
    pub inline_prompt: bool,

    // =========================================================================
    // Batch
    // =========================================================================
    /// Maximum documents compiled at once.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,

    /// Stop scheduling new documents after the first failure.
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            workflows_dir: default_workflows_dir(),
            ignore: Vec::new(),
            default_engine: None,
            strict: false,
            inline_prompt: false,
            max_parallel: default_max_parallel(),
            fail_fast: false,
        }
    }
}
