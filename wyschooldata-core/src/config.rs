//! Client configuration.
//!
//! Loaded from TOML; every section is optional and falls back to the built-in
//! defaults, including the versioned column map and subgroup catalog.
//!
//! ```toml
//! [upstream]
//! base_url = "https://data.example.org/api"
//! timeout_secs = 30
//!
//! [fetch]
//! max_workers = 4
//! ```

use crate::data::{ColumnMap, SubgroupCatalog};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(String),

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where and how the upstream provider is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the JSON endpoint. Only used by the HTTP provider.
    pub base_url: Option<String>,
    /// Per-call timeout for every upstream read.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
        }
    }
}

/// Multi-year fetch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Worker threads used by `fetch_many`; 1 fetches sequentially.
    pub max_workers: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { max_workers: 4 }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub upstream: UpstreamConfig,
    pub fetch: FetchConfig,
    pub columns: ColumnMap,
    pub subgroups: SubgroupCatalog,
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("read {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::Invalid("upstream.timeout_secs must be > 0".into()));
        }
        if self.fetch.max_workers == 0 {
            return Err(ConfigError::Invalid("fetch.max_workers must be > 0".into()));
        }
        self.columns.validate()?;
        self.subgroups.validate()?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }
}
