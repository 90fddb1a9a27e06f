//! Configuration types for fedb

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub host: String,

    /// MySQL protocol port
    pub port: u16,

    /// Storage URI, `scheme://path`
    pub store: String,

    /// Upper bound on how long graceful shutdown waits for connections
    #[serde(with = "humantime_serde")]
    pub graceful_shutdown_timeout: Duration,

    /// Enable TCP keepalive on accepted connections
    pub tcp_keepalive: bool,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4444,
            store: "local:///tmp/fedb".to_string(),
            graceful_shutdown_timeout: Duration::from_secs(30),
            tcp_keepalive: true,
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// `host:port` as passed to the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the configuration, collecting every problem found.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.host.trim().is_empty() {
            errors.push("host must not be empty".to_string());
        }

        if self.port == 0 {
            errors.push("port must be > 0".to_string());
        }

        match self.store.split_once("://") {
            Some((scheme, _)) if !scheme.is_empty() => {}
            _ => errors.push(format!(
                "store must be a uri of the form scheme://path, got '{}'",
                self.store
            )),
        }

        if self.graceful_shutdown_timeout.is_zero() {
            errors.push("graceful_shutdown_timeout must be > 0".to_string());
        }

        if self.logging.format != "text" && self.logging.format != "json" {
            errors.push(format!(
                "logging.format must be 'text' or 'json', got '{}'",
                self.logging.format
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Log format (json or text)
    pub format: String,

    /// Log file path (None for stdout only)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr(), "127.0.0.1:4444");
        assert_eq!(config.store, "local:///tmp/fedb");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let config = ServerConfig {
            host: " ".into(),
            port: 0,
            store: "/tmp/fedb".into(),
            graceful_shutdown_timeout: Duration::ZERO,
            logging: LoggingConfig {
                format: "xml".into(),
                ..LoggingConfig::default()
            },
            ..ServerConfig::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 5, "{:?}", errors);
    }

    #[test]
    fn test_partial_toml() {
        let config: ServerConfig = toml::from_str(
            r#"
            port = 3307
            graceful_shutdown_timeout = "5s"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 3307);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.graceful_shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fedb.toml");
        std::fs::write(&path, "host = \"0.0.0.0\"\nstore = \"LOCAL:///data\"\n").unwrap();

        let config = ServerConfig::from_file(&path).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.store, "LOCAL:///data");

        std::fs::write(&path, "port = \"not a number\"").unwrap();
        assert!(matches!(ServerConfig::from_file(&path), Err(Error::Config(_))));
    }
}
