//! Node configuration, loadable from TOML.
//!
//! ```toml
//! [ledger]
//! owners = ["0x…01", "0x…02", "0x…03"]
//! threshold = 2
//!
//! [viewer]
//! identity = "0x…01"
//! network = 1
//!
//! [runtime]
//! poll_interval_ms = 1000
//! queue_capacity = 256
//! ```

use crate::identity::{IdentityScope, DEFAULT_POLL_INTERVAL};
use multisig_core::ConfigError;
use multisig_ledger::LedgerConfig;
use multisig_types::{Address, NetworkId};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading a node configuration.
#[derive(Debug, Error)]
pub enum NodeConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid ledger config: {0}")]
    Ledger(#[from] ConfigError),
}

/// Everything needed to start a ledger runner and a projection service.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Owners and threshold the ledger is constructed with.
    pub ledger: LedgerConfig,

    /// Initial viewer scope.
    #[serde(default)]
    pub viewer: ViewerConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl NodeConfig {
    pub fn new(ledger: LedgerConfig) -> Self {
        Self {
            ledger,
            viewer: ViewerConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }

    pub fn with_viewer(mut self, viewer: ViewerConfig) -> Self {
        self.viewer = viewer;
        self
    }

    pub fn with_runtime(mut self, runtime: RuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, NodeConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(content: &str) -> Result<Self, NodeConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the ledger section without constructing anything.
    pub fn validate(&self) -> Result<(), NodeConfigError> {
        self.ledger.validate()?;
        Ok(())
    }
}

/// Who the projection is computed for at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub identity: Option<Address>,

    #[serde(default)]
    pub network: NetworkId,
}

impl ViewerConfig {
    pub fn scope(&self) -> IdentityScope {
        IdentityScope::new(self.identity, self.network)
    }
}

/// Task and channel tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// How often the identity provider is polled.
    pub poll_interval_ms: u64,

    /// Requests that may wait for the ledger before callers block.
    pub queue_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            queue_capacity: 256,
        }
    }
}

impl RuntimeConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multisig_test_helpers::{addr, OWNER_A, OWNER_B};
    use std::io::Write;

    fn owners_toml() -> String {
        format!(
            "[ledger]\nowners = [\"{}\", \"{}\"]\nthreshold = 2\n",
            addr(OWNER_A),
            addr(OWNER_B)
        )
    }

    #[test]
    fn test_defaults_apply() {
        let config = NodeConfig::from_toml(&owners_toml()).unwrap();
        assert_eq!(config.ledger.owners, vec![addr(OWNER_A), addr(OWNER_B)]);
        assert_eq!(config.viewer, ViewerConfig::default());
        assert_eq!(config.runtime.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.runtime.queue_capacity, 256);
    }

    #[test]
    fn test_full_config() {
        let text = format!(
            "{}\n[viewer]\nidentity = \"{}\"\nnetwork = 5\n\n[runtime]\npoll_interval_ms = 50\n",
            owners_toml(),
            addr(OWNER_B)
        );
        let config = NodeConfig::from_toml(&text).unwrap();
        assert_eq!(
            config.viewer.scope(),
            IdentityScope::new(Some(addr(OWNER_B)), NetworkId(5))
        );
        assert_eq!(config.runtime.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.runtime.queue_capacity, 256);
    }

    #[test]
    fn test_invalid_ledger_rejected() {
        let text = format!(
            "[ledger]\nowners = [\"{}\"]\nthreshold = 3\n",
            addr(OWNER_A)
        );
        assert!(matches!(
            NodeConfig::from_toml(&text),
            Err(NodeConfigError::Ledger(ConfigError::ThresholdTooLarge { .. }))
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            NodeConfig::from_toml("[ledger]\nthreshold = 1\n"),
            Err(NodeConfigError::Parse(_))
        ));
        assert!(matches!(
            NodeConfig::from_toml("[ledger]\nowners = [\"0x12\"]\nthreshold = 1\n"),
            Err(NodeConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(owners_toml().as_bytes()).unwrap();
        let config = NodeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.ledger.threshold, 2);

        assert!(matches!(
            NodeConfig::from_file(Path::new("/definitely/not/here.toml")),
            Err(NodeConfigError::Io(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = NodeConfig::new(LedgerConfig::new(vec![addr(OWNER_A)], 1))
            .with_viewer(ViewerConfig {
                identity: Some(addr(OWNER_A)),
                network: NetworkId(2),
            })
            .with_runtime(
                RuntimeConfig::default()
                    .with_poll_interval(Duration::from_millis(10))
                    .with_queue_capacity(4),
            );
        assert!(config.validate().is_ok());
        assert_eq!(config.runtime.poll_interval_ms, 10);
        assert_eq!(config.runtime.queue_capacity, 4);
    }
}
