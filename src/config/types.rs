//! The top-level document read by [`super::load`].

use super::auth::AuthConfig;
use super::defaults::default_port;
use super::logging::LoggingConfig;
use super::server::{MultiplayerConfig, ServerConfig};
use super::websocket::WebSocketConfig;
use serde::{Deserialize, Serialize};

/// Every section is optional; a missing one takes its defaults.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// HTTP and WebSocket listener port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Heartbeat timings and per-connection limits.
    #[serde(default)]
    pub server: ServerConfig,
    /// Countdown length and the live game cap.
    #[serde(default)]
    pub multiplayer: MultiplayerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub websocket: WebSocketConfig,
    /// Login tickets, build signatures and the guest policy.
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            server: ServerConfig::default(),
            multiplayer: MultiplayerConfig::default(),
            logging: LoggingConfig::default(),
            websocket: WebSocketConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}
