//! Wolfpack Configuration
//!
//! This module provides configuration structures for the Wolfpack
//! leader-election daemon. Every node in a deployment ships the same
//! `[cluster]` section: the peer list names all participants including
//! the local node, which identifies itself at startup by matching its
//! interface addresses against the list.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Main Wolfpack configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WolfpackConfig {
    /// Node-specific configuration
    #[serde(default)]
    pub node: NodeConfig,

    /// Cluster configuration
    pub cluster: ClusterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Node-specific configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Explicit local address. When unset, the local address is resolved
    /// by matching interface addresses against the configured peer list.
    #[serde(default)]
    pub address: Option<Ipv4Addr>,
}

/// Cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Addresses of every node in the deployment, including this one
    pub peers: Vec<Ipv4Addr>,

    /// UDP port for the control/broadcast channel
    #[serde(default = "default_control_port")]
    pub control_port: u16,

    /// UDP port for the health-probe channel
    #[serde(default = "default_health_port")]
    pub health_port: u16,

    /// Interval between health sweeps in milliseconds
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,

    /// Per-peer wait for a probe answer in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Wait for a control-channel datagram in milliseconds
    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_control_port() -> u16 {
    6000
}

fn default_health_port() -> u16 {
    6001
}

fn default_probe_interval_ms() -> u64 {
    1000
}

fn default_probe_timeout_ms() -> u64 {
    2500
}

fn default_recv_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl WolfpackConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: WolfpackConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.cluster.peers.is_empty() {
            return Err(crate::Error::Config(
                "cluster.peers cannot be empty".into(),
            ));
        }

        if self.cluster.control_port == self.cluster.health_port {
            return Err(crate::Error::Config(
                "cluster.control_port and cluster.health_port must differ".into(),
            ));
        }

        if let Some(address) = self.node.address {
            if !self.cluster.peers.contains(&address) {
                return Err(crate::Error::Config(format!(
                    "node.address {} is not in cluster.peers",
                    address
                )));
            }
        }

        Ok(())
    }

    /// Get the health sweep interval as Duration
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.cluster.probe_interval_ms)
    }

    /// Get the per-peer probe timeout as Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.cluster.probe_timeout_ms)
    }

    /// Get the control receive timeout as Duration
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.cluster.recv_timeout_ms)
    }
}

/// Render a commented sample configuration, used by `wolfpack init`
pub fn sample_config() -> String {
    r#"# Wolfpack Configuration
# Ship the same [cluster] section to every node; each node finds its own
# address in the peer list at startup.

[node]
# Explicit local address. Leave unset to resolve it from the interfaces.
# address = "192.168.0.190"

[cluster]
peers = ["192.168.0.190", "192.168.0.104"]
control_port = 6000
health_port = 6001
probe_interval_ms = 1000
probe_timeout_ms = 2500
recv_timeout_ms = 5000

[logging]
level = "info"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[node]
address = "192.168.0.190"

[cluster]
peers = ["192.168.0.190", "192.168.0.104"]
control_port = 6000
health_port = 6001
"#;

        let config = WolfpackConfig::from_str(toml).unwrap();
        assert_eq!(config.cluster.peers.len(), 2);
        assert_eq!(config.node.address, Some(Ipv4Addr::new(192, 168, 0, 190)));
        assert_eq!(config.probe_interval(), Duration::from_millis(1000));
    }

    #[test]
    fn test_defaults_applied() {
        let toml = r#"
[cluster]
peers = ["10.0.0.1", "10.0.0.2", "10.0.0.3"]
"#;

        let config = WolfpackConfig::from_str(toml).unwrap();
        assert_eq!(config.cluster.control_port, 6000);
        assert_eq!(config.cluster.health_port, 6001);
        assert_eq!(config.probe_timeout(), Duration::from_millis(2500));
        assert_eq!(config.recv_timeout(), Duration::from_millis(5000));
        assert_eq!(config.logging.level, "info");
        assert!(config.node.address.is_none());
    }

    #[test]
    fn test_empty_peers_rejected() {
        let toml = r#"
[cluster]
peers = []
"#;

        assert!(WolfpackConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_colliding_ports_rejected() {
        let toml = r#"
[cluster]
peers = ["10.0.0.1"]
control_port = 6000
health_port = 6000
"#;

        assert!(WolfpackConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_local_address_must_be_configured() {
        let toml = r#"
[node]
address = "10.0.0.9"

[cluster]
peers = ["10.0.0.1", "10.0.0.2"]
"#;

        assert!(WolfpackConfig::from_str(toml).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wolfpack.toml");
        std::fs::write(&path, sample_config()).unwrap();

        let config = WolfpackConfig::from_file(&path).unwrap();
        assert_eq!(config.cluster.peers.len(), 2);
    }

    #[test]
    fn test_sample_config_parses() {
        let config = WolfpackConfig::from_str(&sample_config()).unwrap();
        assert_eq!(config.cluster.control_port, 6000);
    }
}
