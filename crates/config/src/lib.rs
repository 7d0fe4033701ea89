//! Configuration schemas and loaders for cellstore.
//!
//! Two top-level schemas live here: [`ServerConfig`] for the tablet server
//! binary and [`ClientConfig`] for anything that opens a client `Session`.
//! Both load from YAML and are validated before use.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Server configuration
// ---------------------------------------------------------------------------

/// Tablet server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the gRPC services listen on.
    pub listen: SocketAddr,

    /// Human-readable node name reported by the health endpoint.
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Optional Prometheus metrics HTTP port.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for the WAL.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Fsync policy: "always", "batch", "none".
    #[serde(default = "default_fsync")]
    pub fsync: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            fsync: default_fsync(),
        }
    }
}

impl ServerConfig {
    /// Validate that configuration values are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_name.is_empty() {
            return Err(ConfigError::Invalid("node_name must not be empty".into()));
        }
        match self.storage.fsync.as_str() {
            "always" | "batch" | "none" => Ok(()),
            other => Err(ConfigError::Invalid(format!(
                "storage.fsync must be one of always/batch/none, got {:?}",
                other
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// Endpoint configuration for reaching the storage cluster.
///
/// The session treats this as an opaque description of where the cluster
/// lives; it is owned by the caller and passed by reference into
/// `Session::connect`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Cluster addresses ("host:port"), tried in order at connect time.
    pub cluster: Vec<String>,

    /// Optional cluster identifier, echoed in diagnostics only.
    #[serde(default)]
    pub cluster_id: Option<String>,

    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl ClientConfig {
    /// A config pointing at a single address, with default timeouts.
    pub fn single(addr: impl Into<String>) -> Self {
        Self {
            cluster: vec![addr.into()],
            cluster_id: None,
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster.is_empty() {
            return Err(ConfigError::Invalid(
                "cluster must list at least one address".into(),
            ));
        }
        for addr in &self.cluster {
            if !addr.contains(':') {
                return Err(ConfigError::Invalid(format!(
                    "cluster address {:?} must be host:port",
                    addr
                )));
            }
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}

// --- Defaults ---

fn default_node_name() -> String {
    "cellstore-node".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_fsync() -> String {
    "batch".to_string()
}
fn default_connect_timeout_ms() -> u64 {
    5000
}

// --- Loading ---

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Load a `ServerConfig` from a YAML file path.
pub fn load_server_config(path: &std::path::Path) -> Result<ServerConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    server_config_from_str(&contents)
}

/// Load a `ServerConfig` from a YAML string.
pub fn server_config_from_str(yaml: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}

/// Load a `ClientConfig` from a YAML file path.
pub fn load_client_config(path: &std::path::Path) -> Result<ClientConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    client_config_from_str(&contents)
}

/// Load a `ClientConfig` from a YAML string.
pub fn client_config_from_str(yaml: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_server_config() {
        let yaml = r#"
listen: "127.0.0.1:7700"
"#;
        let config = server_config_from_str(yaml).unwrap();
        assert_eq!(config.listen.port(), 7700);
        assert_eq!(config.node_name, "cellstore-node");
        assert_eq!(config.storage.fsync, "batch");
        assert!(config.metrics_port.is_none());
    }

    #[test]
    fn test_parse_full_server_config() {
        let yaml = r#"
listen: "0.0.0.0:8000"
node_name: tablet-a
storage:
  data_dir: /tmp/cellstore-test
  fsync: always
metrics_port: 9100
"#;
        let config = server_config_from_str(yaml).unwrap();
        assert_eq!(config.node_name, "tablet-a");
        assert_eq!(config.storage.fsync, "always");
        assert_eq!(config.metrics_port, Some(9100));
    }

    #[test]
    fn test_server_config_rejects_bad_fsync() {
        let yaml = r#"
listen: "127.0.0.1:7700"
storage:
  fsync: sometimes
"#;
        let err = server_config_from_str(yaml).unwrap_err().to_string();
        assert!(err.contains("fsync"), "error should mention fsync: {}", err);
    }

    #[test]
    fn test_server_config_roundtrip_yaml() {
        let yaml = r#"
listen: "127.0.0.1:9000"
"#;
        let config = server_config_from_str(yaml).unwrap();
        let serialized = serde_yaml::to_string(&config).unwrap();
        let config2 = server_config_from_str(&serialized).unwrap();
        assert_eq!(config.listen, config2.listen);
        assert_eq!(config.node_name, config2.node_name);
    }

    #[test]
    fn test_parse_client_config() {
        let yaml = r#"
cluster:
  - "127.0.0.1:7700"
  - "127.0.0.1:7701"
cluster_id: local-test
"#;
        let config = client_config_from_str(yaml).unwrap();
        assert_eq!(config.cluster.len(), 2);
        assert_eq!(config.cluster_id.as_deref(), Some("local-test"));
        assert_eq!(config.connect_timeout_ms, 5000);
    }

    #[test]
    fn test_client_config_rejects_empty_cluster() {
        let yaml = "cluster: []\n";
        let err = client_config_from_str(yaml).unwrap_err().to_string();
        assert!(
            err.contains("at least one address"),
            "error should mention cluster: {}",
            err
        );
    }

    #[test]
    fn test_client_config_rejects_bad_address() {
        let yaml = r#"
cluster:
  - "no-port-here"
"#;
        let result = client_config_from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_client_config_rejects_zero_timeout() {
        let yaml = r#"
cluster:
  - "127.0.0.1:7700"
connect_timeout_ms: 0
"#;
        let err = client_config_from_str(yaml).unwrap_err().to_string();
        assert!(err.contains("connect_timeout_ms"), "{}", err);
    }

    #[test]
    fn test_client_config_single() {
        let config = ClientConfig::single("127.0.0.1:7700");
        assert!(config.validate().is_ok());
        assert_eq!(config.cluster, vec!["127.0.0.1:7700"]);
    }
}
