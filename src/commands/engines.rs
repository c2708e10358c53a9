//! Implementation of the `awc engines` command.

use crate::engine::{EngineAdapter, EngineRegistry};
use crate::exit_codes;

pub fn cmd_engines() -> anyhow::Result<i32> {
    let registry = EngineRegistry::with_builtin_engines();
    for engine in registry.engines() {
        println!("{}", describe(engine));
    }
    Ok(exit_codes::SUCCESS)
}

/// One listing line: id, name, default version, secrets, description.
pub(crate) fn describe(engine: &dyn EngineAdapter) -> String {
    let version = engine.default_version().unwrap_or("-");
    let secrets = match engine.required_secrets() {
        [] => "-".to_string(),
        secrets => secrets.join(","),
    };
    format!(
        "{:<12} {:<20} {:<8} {:<24} {}",
        engine.id().as_str(),
        engine.display_name(),
        version,
        secrets,
        engine.description()
    )
}
