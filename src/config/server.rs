//! Server and multiplayer behaviour configuration types.

use super::defaults::{
    default_cleanup_interval_secs, default_cors_origins, default_countdown_ms,
    default_max_concurrent_games, default_max_message_size, default_outbound_queue_capacity,
    default_ping_interval_secs, default_ping_timeout_secs,
};
use serde::{Deserialize, Serialize};

/// Connection and housekeeping settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Interval between server pings on every connection (seconds)
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// Sessions without a pong for this long are dropped (seconds)
    #[serde(default = "default_ping_timeout_secs")]
    pub ping_timeout_secs: u64,
    /// Interval for the stale-session cleanup task (seconds)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
    /// Capacity of each connection's outbound packet queue
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Largest inbound frame accepted (bytes)
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Comma separated list of allowed origins, or `*`
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: default_ping_interval_secs(),
            ping_timeout_secs: default_ping_timeout_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            max_message_size: default_max_message_size(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Match engine settings.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MultiplayerConfig {
    /// Delay between a countdown start and the match start (milliseconds)
    #[serde(default = "default_countdown_ms")]
    pub countdown_ms: u64,
    /// Creation requests beyond this many active games are refused
    #[serde(default = "default_max_concurrent_games")]
    pub max_concurrent_games: usize,
}

impl Default for MultiplayerConfig {
    fn default() -> Self {
        Self {
            countdown_ms: default_countdown_ms(),
            max_concurrent_games: default_max_concurrent_games(),
        }
    }
}
