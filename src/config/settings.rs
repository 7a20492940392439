//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default bind and connect host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default bind and connect port.
pub const DEFAULT_PORT: u16 = 9875;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Bridge server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// RPC client settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "server.host must not be empty".to_string(),
            });
        }
        if self.client.host.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "client.host must not be empty".to_string(),
            });
        }
        if self.server.shutdown_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "server.shutdown_timeout_ms must be greater than 0".to_string(),
            });
        }
        if self.client.timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "client.timeout_ms must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ),
            });
        }
        Ok(())
    }
}

/// Bridge server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind. Port 0 picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on how long `stop()` waits for the loop thread, in ms.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

impl ServerConfig {
    /// Returns the shutdown wait as a [`Duration`].
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

/// RPC client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Host of the bridge server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the bridge server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-call timeout (connect + request + reply), in ms.
    #[serde(default = "default_client_timeout_ms")]
    pub timeout_ms: u64,
}

impl ClientConfig {
    /// Returns the `host:port` address string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the call timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_ms: default_client_timeout_ms(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_shutdown_timeout_ms() -> u64 {
    1000
}

const fn default_client_timeout_ms() -> u64 {
    30_000
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
