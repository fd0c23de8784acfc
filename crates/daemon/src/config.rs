// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Configuration is stored in a TOML file (by default
//! `~/.config/plansync/config.toml`) and includes:
//! - `server`: the optional local subscriber API
//! - `connection`: one table per remote charge-control service

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ps_core::VehicleScope;

use crate::error::{Error, Result};

const CONFIG_DIR_NAME: &str = "plansync";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Remote services to keep in sync.
    #[serde(default, rename = "connection")]
    pub connections: Vec<ConnectionConfig>,
}

/// Local subscriber API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            enabled: false,
            bind: default_bind(),
        }
    }
}

/// One remote charge-control service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Unique name. Defaults to `host:port`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Use https/wss instead of http/ws.
    #[serde(default)]
    pub ssl: bool,
    /// Optional bearer token for REST requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// REST request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Fixed-interval fetch and reconcile, in seconds (default: 30).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Snapshot age after which writes refetch before mutating (default: 60).
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    /// Enable the push channel (default: true).
    #[serde(default = "default_true")]
    pub websocket: bool,
    /// Which vehicles to track (default: all).
    #[serde(default)]
    pub vehicles: VehicleScope,
    #[serde(default)]
    pub push: PushConfig,
}

/// Push channel tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Initial and post-connect reconnect delay in milliseconds (default: 1000).
    #[serde(default = "default_backoff_floor_ms")]
    pub backoff_floor_ms: u64,
    /// Maximum reconnect delay in seconds (default: 60).
    #[serde(default = "default_backoff_ceiling_secs")]
    pub backoff_ceiling_secs: u64,
    /// Max time to wait for the connection to open, in seconds (default: 10).
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,
    /// Keep-alive ping interval in seconds (default: 30). 0 = disabled.
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// Max time to wait for any frame after a ping, in seconds (default: 10).
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,
    /// Drop the connection after this long without any frame, in seconds (default: 90).
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Relay queue capacity (default: 100).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Largest accepted push message in bytes (default: 1 MB).
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        PushConfig {
            backoff_floor_ms: default_backoff_floor_ms(),
            backoff_ceiling_secs: default_backoff_ceiling_secs(),
            open_timeout_secs: default_open_timeout_secs(),
            ping_interval_secs: default_ping_interval_secs(),
            ping_timeout_secs: default_ping_timeout_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            queue_capacity: default_queue_capacity(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7071))
}

fn default_port() -> u16 {
    7070
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_secs() -> u64 {
    30
}

fn default_stale_after_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_backoff_floor_ms() -> u64 {
    1_000
}

fn default_backoff_ceiling_secs() -> u64 {
    60
}

fn default_open_timeout_secs() -> u64 {
    10
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_ping_timeout_secs() -> u64 {
    10
}

fn default_idle_timeout_secs() -> u64 {
    90
}

fn default_queue_capacity() -> usize {
    100
}

fn default_max_message_bytes() -> usize {
    1_000_000
}

impl ConnectionConfig {
    /// Creates a connection config with defaults for everything but the host.
    pub fn new(host: impl Into<String>) -> Self {
        ConnectionConfig {
            name: None,
            host: host.into(),
            port: default_port(),
            ssl: false,
            token: None,
            timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            stale_after_secs: default_stale_after_secs(),
            websocket: true,
            vehicles: VehicleScope::All,
            push: PushConfig::default(),
        }
    }

    /// The unique name of this connection.
    pub fn name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.host, self.port))
    }

    /// Base URL of the REST API, e.g. `http://host:7070/api`.
    pub fn api_url(&self) -> String {
        let scheme = if self.ssl { "https" } else { "http" };
        format!("{}://{}:{}/api", scheme, self.host, self.port)
    }

    /// URL of the push endpoint, e.g. `ws://host:7070/ws`.
    pub fn ws_url(&self) -> String {
        let scheme = if self.ssl { "wss" } else { "ws" };
        format!("{}://{}:{}/ws", scheme, self.host, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// The default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Loads and validates configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Rejects configurations the daemon cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.connections.is_empty() {
            return Err(Error::Config(
                "no connections configured\n  hint: add a [[connection]] table with a host".into(),
            ));
        }
        let mut names = HashSet::new();
        for conn in &self.connections {
            let name = conn.name();
            if conn.host.trim().is_empty() {
                return Err(Error::Config(format!("connection '{}': host is empty", name)));
            }
            if conn.port == 0 {
                return Err(Error::Config(format!("connection '{}': port is 0", name)));
            }
            if conn.poll_interval_secs == 0 {
                return Err(Error::Config(format!(
                    "connection '{}': poll_interval_secs must be positive",
                    name
                )));
            }
            if conn.push.queue_capacity == 0 {
                return Err(Error::Config(format!(
                    "connection '{}': push.queue_capacity must be positive",
                    name
                )));
            }
            if conn.push.backoff_floor_ms == 0
                || conn.push.backoff_floor_ms > conn.push.backoff_ceiling_secs * 1000
            {
                return Err(Error::Config(format!(
                    "connection '{}': push.backoff_floor_ms must be positive and not exceed the ceiling",
                    name
                )));
            }
            if !names.insert(name.clone()) {
                return Err(Error::Config(format!("duplicate connection name '{}'", name)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
