//! Connection configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via SWARMDB_CONFIG)
//! 3. Environment variables

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default endpoint of a local swarm node.
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:50000";

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// WebSocket URL of the swarm node (`ws://` or `wss://`).
    pub endpoint: String,
    /// Time allowed for the WebSocket handshake, in seconds.
    pub connect_timeout_secs: u64,
    /// Trace traffic through `tracing` when no other sink is supplied.
    pub trace_traffic: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            trace_traffic: false,
        }
    }
}

impl ConnectionConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_trace_traffic(mut self, enabled: bool) -> Self {
        self.trace_traffic = enabled;
        self
    }

    /// Returns the connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("SWARMDB_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Self::from_yaml(&content).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))
    }

    fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| e.to_string())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from `lookup`, ignoring values that do not parse.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup("SWARMDB_ENDPOINT") {
            self.endpoint = endpoint;
        }

        if let Some(timeout) = lookup("SWARMDB_CONNECT_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.connect_timeout_secs = secs;
            }
        }

        if let Some(trace) = lookup("SWARMDB_TRACE") {
            self.trace_traffic = matches!(trace.as_str(), "1" | "true" | "yes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(!config.trace_traffic);
    }

    #[test]
    fn test_config_builders() {
        let config = ConnectionConfig::new("wss://node.example:51010")
            .with_connect_timeout(Duration::from_millis(10))
            .with_trace_traffic(true);
        assert_eq!(config.endpoint, "wss://node.example:51010");
        // Sub-second timeouts round up to one second.
        assert_eq!(config.connect_timeout_secs, 1);
        assert!(config.trace_traffic);
    }

    #[test]
    fn test_config_partial_yaml_keeps_defaults() {
        let config = ConnectionConfig::from_yaml("endpoint: ws://10.0.0.5:50000\n").unwrap();
        assert_eq!(config.endpoint, "ws://10.0.0.5:50000");
        assert_eq!(config.connect_timeout_secs, DEFAULT_CONNECT_TIMEOUT_SECS);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "endpoint: ws://swarm.local:50001").unwrap();
        writeln!(file, "connect_timeout_secs: 3").unwrap();
        writeln!(file, "trace_traffic: true").unwrap();

        let config = ConnectionConfig::from_file(file.path()).unwrap();
        assert_eq!(config.endpoint, "ws://swarm.local:50001");
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert!(config.trace_traffic);
    }

    #[test]
    fn test_config_from_missing_file() {
        let err = ConnectionConfig::from_file("/nonexistent/swarmdb.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(..)));
    }

    #[test]
    fn test_config_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "connect_timeout_secs: soon").unwrap();

        let err = ConnectionConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
    }

    #[test]
    fn test_config_overrides() {
        let env: HashMap<&str, &str> = [
            ("SWARMDB_ENDPOINT", "ws://override:1"),
            ("SWARMDB_CONNECT_TIMEOUT", "not-a-number"),
            ("SWARMDB_TRACE", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = ConnectionConfig::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.endpoint, "ws://override:1");
        assert_eq!(config.connect_timeout_secs, DEFAULT_CONNECT_TIMEOUT_SECS);
        assert!(config.trace_traffic);
    }
}
