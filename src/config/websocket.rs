//! `websocket` section: limits applied before a socket is upgraded.

use serde::{Deserialize, Serialize};

const MAX_AUTH_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WebSocketConfig {
    /// How long the authenticator may take to resolve a login ticket.
    pub auth_timeout_secs: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            auth_timeout_secs: 10,
        }
    }
}

impl WebSocketConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1..=MAX_AUTH_TIMEOUT_SECS).contains(&self.auth_timeout_secs) {
            anyhow::bail!(
                "websocket.auth_timeout_secs must be between 1 and {MAX_AUTH_TIMEOUT_SECS} (configured: {})",
                self.auth_timeout_secs
            );
        }
        Ok(())
    }
}
