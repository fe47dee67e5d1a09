//! Config schema. Missing fields fall back to the defaults below.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlottyConfig {
    pub server: ServerConfig,
}

/// Settings for `blotty serve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IP address to listen on.
    pub address: String,
    pub port: u16,
    /// Let clients type into the terminal.
    pub permit_write: bool,
    /// Window title template; `{command}`, `{argv}` and `{hostname}` are
    /// substituted.
    pub title_format: String,
    /// Ask clients to reconnect after a disconnect.
    pub reconnect: bool,
    /// Seconds a client waits before reconnecting.
    pub reconnect_time: u32,
    /// Fixed terminal columns; 0 follows the client.
    pub width: u16,
    /// Fixed terminal rows; 0 follows the client.
    pub height: u16,
    /// Directory for session recordings; recording is off when unset.
    pub record_dir: Option<PathBuf>,
    /// Client terminal preferences, forwarded as JSON.
    pub preferences: Option<toml::Table>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 8080,
            permit_write: false,
            title_format: "{command}@{hostname}".into(),
            reconnect: false,
            reconnect_time: 10,
            width: 0,
            height: 0,
            record_dir: None,
            preferences: None,
        }
    }
}

impl ServerConfig {
    /// `address:port` for binding.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Reconnect delay to announce, 0 when reconnecting is off.
    pub fn reconnect_seconds(&self) -> u32 {
        if self.reconnect {
            self.reconnect_time
        } else {
            0
        }
    }

    /// Preferences converted to a JSON value.
    pub fn preferences_json(&self) -> Option<serde_json::Value> {
        let table = self.preferences.as_ref()?;
        match serde_json::to_value(table) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("failed to convert preferences to JSON: {e}");
                None
            }
        }
    }
}
