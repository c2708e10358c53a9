//! Config loading, validation, and discovery helpers.

use super::model::CompilerConfig;
use super::types::{CONFIG_FILE, IgnoreSet};
use crate::engine::EngineId;
use crate::suggest;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config validation failed: {0}")]
    Invalid(String),
}

impl CompilerConfig {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Load `<repo_root>/.github/awc.yaml`, or defaults when it does not exist.
    pub fn discover<P: AsRef<Path>>(repo_root: P) -> Result<Self, ConfigError> {
        let path = repo_root.as_ref().join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no project config, using defaults");
            return Ok(Self::default());
        }
        tracing::debug!(path = %path.display(), "loading project config");
        Self::load(path)
    }

    /// Parse config from a YAML string. An empty document yields defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: CompilerConfig = if yaml.trim().is_empty() {
            CompilerConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `workflows_dir` must be non-empty
    /// - `max_parallel` must be positive
    /// - `default_engine` must name a known engine
    /// - `ignore` entries must be valid glob patterns
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workflows_dir.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "workflows_dir must not be empty".to_string(),
            ));
        }

        if self.max_parallel == 0 {
            return Err(ConfigError::Invalid(
                "max_parallel must be greater than 0".to_string(),
            ));
        }

        if let Some(engine) = &self.default_engine
            && EngineId::parse(engine).is_none()
        {
            let suggestions = suggest::rank(
                engine,
                EngineId::ALL.iter().map(|id| id.as_str()),
                suggest::MAX_SUGGESTIONS,
            );
            let mut message = format!("default_engine '{}' is not a known engine", engine);
            if !suggestions.is_empty() {
                message.push_str(". ");
                message.push_str(&suggest::did_you_mean(&suggestions));
            }
            return Err(ConfigError::Invalid(message));
        }

        self.ignore_set()?;
        Ok(())
    }

    /// The compiled `ignore` patterns.
    pub fn ignore_set(&self) -> Result<IgnoreSet, ConfigError> {
        IgnoreSet::new(&self.ignore)
            .map_err(|e| ConfigError::Invalid(format!("invalid ignore pattern: {}", e)))
    }

    /// `workflows_dir` resolved against the repository root.
    pub fn workflows_path<P: AsRef<Path>>(&self, repo_root: P) -> PathBuf {
        repo_root.as_ref().join(&self.workflows_dir)
    }
}
