//! Cirrus configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CirrusConfig {
    pub naming: NamingConfig,
    pub services: ServicesConfig,
}

impl CirrusConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing path or a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if path.exists() {
            debug!(path = %path.display(), "Loading configuration");
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml_str(&contents)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Name allocation settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Existence probes (and claims) allowed before giving up
    pub max_attempts: u32,

    /// Highest sequence; allocation wraps to 0 past it
    pub max_sequence: u32,

    /// Zero-padded width of the `-vNNN` suffix
    pub sequence_digits: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            max_sequence: 999,
            sequence_digits: 3,
        }
    }
}

/// Service lifecycle settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Remote feature flag that must be enabled to share managed instances
    pub sharing_feature_flag: String,

    /// Separator between organization and space in region strings
    pub region_separator: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            sharing_feature_flag: "service_instance_sharing".to_string(),
            region_separator: crate::region::REGION_SEPARATOR.to_string(),
        }
    }
}
