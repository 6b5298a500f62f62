// src/config/loader.rs
//! Configuration loader with path discovery and validation

use crate::config::{constants::paths, StimConfig};
use crate::utils::validation::ValidationError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A caller-supplied path did not exist
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The file existed but was not valid TOML for [`StimConfig`]
    #[error("configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The parsed configuration failed validation
    #[error("configuration validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Underlying filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads [`StimConfig`] from the first configuration file found
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Create a loader over the default discovery paths.
    pub fn new() -> Self {
        Self {
            config_paths: paths::CONFIG_FILE_CANDIDATES
                .iter()
                .map(PathBuf::from)
                .collect(),
        }
    }

    /// Create a loader over caller-supplied paths.
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
        }
    }

    /// Load the first configuration file that exists, falling back to the
    /// built-in defaults when none is present.
    pub fn load(&self) -> Result<StimConfig, ConfigError> {
        for path in &self.config_paths {
            if path.is_file() {
                info!(path = %path.display(), "loading configuration");
                return Self::load_file(path);
            }
            debug!(path = %path.display(), "configuration candidate not present");
        }

        debug!("no configuration file found, using defaults");
        Ok(StimConfig::default())
    }

    /// Load and validate a specific configuration file.
    pub fn load_file(path: &Path) -> Result<StimConfig, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let raw = std::fs::read_to_string(path)?;
        let config: StimConfig = toml::from_str(&raw)?;
        config.supervisor.validate()?;
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constants::supervisor;

    #[test]
    fn test_missing_candidates_fall_back_to_defaults() {
        let loader = ConfigLoader::with_paths(vec![PathBuf::from("does/not/exist.toml")]);
        let config = loader.load().expect("defaults expected");
        assert_eq!(
            config.supervisor.cancellation_grace_ms,
            supervisor::DEFAULT_CANCELLATION_GRACE_MS
        );
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = ConfigLoader::load_file(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
