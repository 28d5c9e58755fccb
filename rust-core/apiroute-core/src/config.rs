//! # Configuration
//!
//! Server and invoker settings, loadable from TOML. Every field has a default,
//! so an empty document is a valid configuration.
//!
//! ```toml
//! [server]
//! address = "0.0.0.0:8080"
//! max_body_size = 65536
//!
//! [invoker]
//! long_running_limit_ms = 500
//! ```

use crate::error::Result;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Default milliseconds until an invocation counts as long running
pub const DEFAULT_LONG_RUNNING_LIMIT_MS: u64 = 1000;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Handler invocation settings
    pub invoker: InvokerConfig,
}

impl Config {
    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the document is not valid
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, `Error::Config` if it
    /// cannot be parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

/// HTTP Server configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_secs: u64,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 8000).into(),
            keep_alive: true,
            shutdown_timeout_secs: 30,
            max_body_size: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Shutdown timeout as a `Duration`
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Invoker configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InvokerConfig {
    /// Executions slower than this fire the long-running callbacks; 0 disables
    pub long_running_limit_ms: u64,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            long_running_limit_ms: DEFAULT_LONG_RUNNING_LIMIT_MS,
        }
    }
}

impl InvokerConfig {
    /// The limit, or `None` if the check is disabled
    #[must_use]
    pub const fn long_running_limit(&self) -> Option<Duration> {
        if self.long_running_limit_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.long_running_limit_ms))
        }
    }
}
