//! Server configuration

use std::net::{AddrParseError, SocketAddr};

use crate::persistence::DatabaseConfig;

/// Configuration for the Results API server
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Interface to bind (IP literal)
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Backing store settings
    pub database: DatabaseConfig,
    /// Per-request timeout for the history client, seconds
    pub client_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            database: DatabaseConfig::default(),
            client_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults on missing or unparsable values
    pub fn from_env() -> AppConfig {
        let mut config = AppConfig::default();
        config.database = DatabaseConfig::from_env();

        if let Ok(host) = std::env::var("FUNDTRACE_HOST") {
            if !host.is_empty() {
                config.host = host;
            }
        }

        if let Ok(port) = std::env::var("FUNDTRACE_PORT") {
            match port.parse::<u16>() {
                Ok(value) => config.port = value,
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse FUNDTRACE_PORT '{}': {}, using default: {}",
                        port,
                        e,
                        config.port
                    );
                }
            }
        }

        if let Ok(timeout) = std::env::var("CLIENT_TIMEOUT_SECS") {
            match timeout.parse::<u64>() {
                Ok(value) if value > 0 => config.client_timeout_secs = value,
                Ok(value) => {
                    tracing::warn!(
                        "Invalid CLIENT_TIMEOUT_SECS value: {} (must be positive), using default: {}",
                        value,
                        config.client_timeout_secs
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse CLIENT_TIMEOUT_SECS '{}': {}, using default: {}",
                        timeout,
                        e,
                        config.client_timeout_secs
                    );
                }
            }
        }

        config
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
