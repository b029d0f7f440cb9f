//! Chain maintenance configuration

use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Default number of relationships a sparse node may hold before promotion
pub const DEFAULT_DENSE_NODE_THRESHOLD: usize = 50;

/// Default payload bytes per dynamic record
pub const DEFAULT_DYNAMIC_RECORD_DATA_SIZE: usize = 120;

/// Configuration for the property and relationship chain managers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// A sparse node is promoted to dense once its degree exceeds this
    pub dense_node_threshold: usize,
    /// Emit a diagnostic entry when deleting a damaged property chain
    pub log_inconsistent_property_chains: bool,
    /// Payload bytes per dynamic overflow record
    pub dynamic_record_data_size: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            dense_node_threshold: DEFAULT_DENSE_NODE_THRESHOLD,
            log_inconsistent_property_chains: true,
            dynamic_record_data_size: DEFAULT_DYNAMIC_RECORD_DATA_SIZE,
        }
    }
}

/// Configuration file structure
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    chains: ChainConfig,
}

impl ChainConfig {
    /// Parse the `[chains]` table of a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| Error::config(format!("invalid TOML: {e}")))?;
        file.chains.validated()
    }

    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!("Loaded chain configuration from {:?}", path);
        Ok(config)
    }

    /// Defaults overridden by `LINKSTORE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up by variable name
    ///
    /// Recognised: `LINKSTORE_DENSE_NODE_THRESHOLD`,
    /// `LINKSTORE_LOG_INCONSISTENT_CHAINS`, `LINKSTORE_DYNAMIC_RECORD_DATA_SIZE`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup("LINKSTORE_DENSE_NODE_THRESHOLD") {
            self.dense_node_threshold = parse_override("LINKSTORE_DENSE_NODE_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("LINKSTORE_LOG_INCONSISTENT_CHAINS") {
            self.log_inconsistent_property_chains =
                parse_override("LINKSTORE_LOG_INCONSISTENT_CHAINS", &value)?;
        }
        if let Some(value) = lookup("LINKSTORE_DYNAMIC_RECORD_DATA_SIZE") {
            self.dynamic_record_data_size =
                parse_override("LINKSTORE_DYNAMIC_RECORD_DATA_SIZE", &value)?;
        }
        self.validated()
    }

    /// Check value ranges
    pub fn validated(self) -> Result<Self> {
        if self.dense_node_threshold == 0 {
            return Err(Error::config("dense_node_threshold must be at least 1"));
        }
        if self.dynamic_record_data_size < 8 {
            return Err(Error::config("dynamic_record_data_size must be at least 8 bytes"));
        }
        Ok(self)
    }
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::config(format!("{name} has invalid value {value:?}")))
}
