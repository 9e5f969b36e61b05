//! Configuration management for the RAX chat relay
//!
//! Built-in defaults, overridden by an optional `config.toml`, overridden by
//! `RAX_CHAT_*` environment variables.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address or host name to listen on
    /// Environment: RAX_CHAT_BIND_ADDRESS
    pub bind_address: String,

    /// Listening port; 0 picks an ephemeral port
    /// Environment: RAX_CHAT_PORT
    pub port: u16,

    /// Maximum concurrent clients; also the listen backlog
    /// Environment: RAX_CHAT_MAX_CLIENTS
    pub max_clients: usize,

    /// Seconds between roster broadcasts
    pub roster_interval_secs: u64,

    /// Seconds to wait for an in-flight roster broadcast when stopping
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 2000,
            max_clients: 100,
            roster_interval_secs: 5,
            shutdown_grace_secs: 5,
        }
    }
}

impl ServerConfig {
    /// Load `config.toml` (if present) with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load from the named config file (extension optional, file optional)
    pub fn load_from(name: &str) -> Result<Self, config::ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(name).required(false))
            .add_source(Environment::with_prefix("RAX_CHAT"))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "bind_address cannot be empty".into(),
            ));
        }

        if self.max_clients == 0 {
            return Err(config::ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.roster_interval_secs == 0 {
            return Err(config::ConfigError::Message(
                "roster_interval_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Bind address and port as `host:port`
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Listen backlog, capped to what the socket API accepts
    pub fn backlog(&self) -> u32 {
        u32::try_from(self.max_clients).unwrap_or(u32::MAX)
    }

    pub fn roster_interval(&self) -> Duration {
        Duration::from_secs(self.roster_interval_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
