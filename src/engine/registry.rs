//! Engine lookup by name.

use super::{ClaudeEngine, CopilotEngine, CopilotSdkEngine, CustomEngine, EngineAdapter};
use crate::error::{CompileError, Result};
use crate::suggest;

/// The set of engines a compile may select from.
#[derive(Debug)]
pub struct EngineRegistry {
    engines: Vec<Box<dyn EngineAdapter>>,
}

impl EngineRegistry {
    /// Registry with every supported engine.
    pub fn with_builtin_engines() -> Self {
        Self {
            engines: vec![
                Box::new(CopilotEngine),
                Box::new(CopilotSdkEngine),
                Box::new(ClaudeEngine),
                Box::new(CustomEngine),
            ],
        }
    }

    /// Registered engine ids, in registration order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.engines.iter().map(|e| e.id().as_str()).collect()
    }

    pub fn engines(&self) -> impl Iterator<Item = &dyn EngineAdapter> {
        self.engines.iter().map(|e| &**e)
    }

    pub fn is_valid_engine(&self, name: &str) -> bool {
        self.engines.iter().any(|e| e.id().as_str() == name)
    }

    /// Look up an engine; unknown names get near-miss suggestions.
    pub fn get(&self, name: &str) -> Result<&dyn EngineAdapter> {
        if let Some(engine) = self.engines.iter().find(|e| e.id().as_str() == name) {
            return Ok(&**engine);
        }

        let ids = self.ids();
        let suggestions = suggest::rank(name, ids.iter().copied(), suggest::MAX_SUGGESTIONS);
        let mut message = format!("unknown engine '{}'", name);
        if suggestions.is_empty() {
            message.push_str(&format!(". Available engines: {}", ids.join(", ")));
        } else {
            message.push_str(". ");
            message.push_str(&suggest::did_you_mean(&suggestions));
        }
        Err(CompileError::Configuration {
            message,
            location: None,
            suggestions,
        })
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::with_builtin_engines()
    }
}
