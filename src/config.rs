//! Configuration file management for the metrics server.
//!
//! Settings come from three places, merged with clear precedence:
//!
//! 1. Default values (lowest priority)
//! 2. Configuration file (given with --config)
//! 3. Command-line arguments (highest priority)
//!
//! # Example Configuration File
//!
//! ```toml
//! log_level = "info"
//! process_metrics = false
//!
//! [server]
//! port = 60000
//! tls_cert = "/etc/secrets/tls.crt"
//! tls_key = "/etc/secrets/tls.key"
//! shutdown_timeout_secs = 10
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Certificate served by the metrics endpoint unless configured otherwise.
pub const DEFAULT_TLS_CERT: &str = "/etc/secrets/tls.crt";
/// Private key matching [`DEFAULT_TLS_CERT`].
pub const DEFAULT_TLS_KEY: &str = "/etc/secrets/tls.key";
pub const DEFAULT_PORT: i64 = 60000;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Top-level configuration.
///
/// All fields are optional to support partial configuration and merging.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Log filter used when `RUST_LOG` is not set
    pub log_level: Option<String>,
    /// Register the process collector (Linux only)
    pub process_metrics: Option<bool>,
    /// Exposition server settings
    pub server: Option<ServerSection>,
}

/// The `[server]` table of the configuration file.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerSection {
    /// Port to listen on; must be positive
    pub port: Option<i64>,
    /// PEM certificate (chain) file
    pub tls_cert: Option<PathBuf>,
    /// PEM private key file
    pub tls_key: Option<PathBuf>,
    /// Deadline for graceful shutdown, in seconds
    pub shutdown_timeout_secs: Option<u64>,
}

/// Fully resolved settings for one run of the exposition server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Kept signed so that zero and negative values can be rejected at start.
    pub port: i64,
    pub tls_cert: PathBuf,
    pub tls_key: PathBuf,
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Settings on `port` with the default TLS paths and shutdown deadline.
    pub fn new(port: i64) -> Self {
        ServerConfig {
            port,
            tls_cert: PathBuf::from(DEFAULT_TLS_CERT),
            tls_key: PathBuf::from(DEFAULT_TLS_KEY),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }

    pub fn with_tls(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.tls_cert = cert.into();
        self.tls_key = key.into();
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully parsed configuration
    /// * `Err(ConfigError::Io)` - File could not be read
    /// * `Err(ConfigError::Parse)` - File contains invalid TOML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    /// Creates the default configuration.
    ///
    /// # Default Values
    ///
    /// - `log_level`: "info"
    /// - `process_metrics`: false
    /// - `server.port`: 60000
    /// - `server.tls_cert`: "/etc/secrets/tls.crt"
    /// - `server.tls_key`: "/etc/secrets/tls.key"
    /// - `server.shutdown_timeout_secs`: 10
    pub fn default() -> Self {
        Config {
            log_level: Some("info".to_string()),
            process_metrics: Some(false),
            server: Some(ServerSection {
                port: Some(DEFAULT_PORT),
                tls_cert: Some(PathBuf::from(DEFAULT_TLS_CERT)),
                tls_key: Some(PathBuf::from(DEFAULT_TLS_KEY)),
                shutdown_timeout_secs: Some(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            }),
        }
    }

    /// Merges this configuration with another, prioritizing the other's values.
    ///
    /// For each field, a `Some` in `other` overrides this config's value and a
    /// `None` keeps it.
    pub fn merge_with(mut self, other: Config) -> Self {
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.process_metrics.is_some() {
            self.process_metrics = other.process_metrics;
        }
        if let Some(other_server) = other.server {
            if let Some(ref mut self_server) = self.server {
                if other_server.port.is_some() {
                    self_server.port = other_server.port;
                }
                if other_server.tls_cert.is_some() {
                    self_server.tls_cert = other_server.tls_cert;
                }
                if other_server.tls_key.is_some() {
                    self_server.tls_key = other_server.tls_key;
                }
                if other_server.shutdown_timeout_secs.is_some() {
                    self_server.shutdown_timeout_secs = other_server.shutdown_timeout_secs;
                }
            } else {
                self.server = Some(other_server);
            }
        }
        self
    }

    /// Creates a Config from command-line arguments for merging.
    ///
    /// Only provided arguments (Some values) will override other configurations.
    pub fn from_cli_args(
        port: Option<i64>,
        tls_cert: Option<PathBuf>,
        tls_key: Option<PathBuf>,
        shutdown_timeout_secs: Option<u64>,
        log_level: Option<String>,
        process_metrics: Option<bool>,
    ) -> Self {
        Config {
            log_level,
            process_metrics,
            server: Some(ServerSection {
                port,
                tls_cert,
                tls_key,
                shutdown_timeout_secs,
            }),
        }
    }

    /// Resolves the `[server]` table into concrete settings.
    ///
    /// Missing values fall back to the defaults. The port is passed through
    /// as-is; rejecting a non-positive port is the server's job.
    ///
    /// # Errors
    ///
    /// `ConfigError::Validation` if the shutdown deadline is zero.
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        let section = self.server.clone().unwrap_or(ServerSection {
            port: None,
            tls_cert: None,
            tls_key: None,
            shutdown_timeout_secs: None,
        });

        let timeout_secs = section
            .shutdown_timeout_secs
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "server.shutdown_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(ServerConfig {
            port: section.port.unwrap_or(DEFAULT_PORT),
            tls_cert: section
                .tls_cert
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TLS_CERT)),
            tls_key: section
                .tls_key
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TLS_KEY)),
            shutdown_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn process_metrics(&self) -> bool {
        self.process_metrics.unwrap_or(false)
    }

    /// Generates an example configuration file in TOML format.
    pub fn example_toml() -> String {
        toml::to_string_pretty(&Config::default())
            .unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

/// Errors that can occur during configuration loading and parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("IO Error: {0}")]
    Io(String),
    /// TOML parsing error (invalid syntax, type mismatch, etc.)
    #[error("Parse Error: {0}")]
    Parse(String),
    /// Validation error (invalid values)
    #[error("Validation Error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_from_toml() {
        let toml_content = r#"
            log_level = "debug"
            process_metrics = true

            [server]
            port = 8443
            tls_cert = "/tmp/tls.crt"
            tls_key = "/tmp/tls.key"
            shutdown_timeout_secs = 3
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = Config::from_file(temp_file.path()).unwrap();

        assert_eq!(config.log_level, Some("debug".to_string()));
        assert_eq!(config.process_metrics, Some(true));

        let server = config.server.unwrap();
        assert_eq!(server.port, Some(8443));
        assert_eq!(server.tls_cert, Some(PathBuf::from("/tmp/tls.crt")));
        assert_eq!(server.tls_key, Some(PathBuf::from("/tmp/tls.key")));
        assert_eq!(server.shutdown_timeout_secs, Some(3));
    }

    #[test]
    fn test_config_merge() {
        let base_config = Config::default();

        let override_config = Config {
            log_level: None,
            process_metrics: Some(true),
            server: Some(ServerSection {
                port: Some(9443),
                tls_cert: None,
                tls_key: Some(PathBuf::from("/override/tls.key")),
                shutdown_timeout_secs: None,
            }),
        };

        let merged = base_config.merge_with(override_config);

        assert_eq!(merged.log_level, Some("info".to_string())); // From base
        assert_eq!(merged.process_metrics, Some(true));

        let server = merged.server.unwrap();
        assert_eq!(server.port, Some(9443));
        assert_eq!(server.tls_cert, Some(PathBuf::from(DEFAULT_TLS_CERT)));
        assert_eq!(server.tls_key, Some(PathBuf::from("/override/tls.key")));
        assert_eq!(server.shutdown_timeout_secs, Some(10));
    }

    #[test]
    fn test_merge_into_empty_server_section() {
        let base = Config {
            log_level: None,
            process_metrics: None,
            server: None,
        };
        let merged = base.merge_with(Config::from_cli_args(
            Some(1234),
            None,
            None,
            None,
            None,
            None,
        ));
        assert_eq!(merged.server.unwrap().port, Some(1234));
    }

    #[test]
    fn test_config_default_resolves() {
        let server = Config::default().server_config().unwrap();

        assert_eq!(server.port, DEFAULT_PORT);
        assert_eq!(server.tls_cert, PathBuf::from("/etc/secrets/tls.crt"));
        assert_eq!(server.tls_key, PathBuf::from("/etc/secrets/tls.key"));
        assert_eq!(server.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(server, ServerConfig::new(DEFAULT_PORT));
    }

    #[test]
    fn test_negative_port_passes_through() {
        let config = Config::default().merge_with(Config::from_cli_args(
            Some(-5),
            None,
            None,
            None,
            None,
            None,
        ));
        assert_eq!(config.server_config().unwrap().port, -5);
    }

    #[test]
    fn test_zero_shutdown_timeout_rejected() {
        let config = Config::default().merge_with(Config::from_cli_args(
            None,
            None,
            None,
            Some(0),
            None,
            None,
        ));
        match config.server_config() {
            Err(ConfigError::Validation(_)) => {}
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[server\nport = ").unwrap();

        match Config::from_file(temp_file.path()) {
            Err(ConfigError::Parse(_)) => {}
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/nonexistent/registry-operator-metrics.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_example_toml_generation() {
        let example = Config::example_toml();
        let parsed: Config = toml::from_str(&example).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
