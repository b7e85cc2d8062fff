//! Login verification configuration.

use super::defaults::{default_allow_guests, default_guest_id_start};
use serde::{Deserialize, Serialize};

/// A pre-provisioned account accepted by the static authenticator.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StaticUserEntry {
    /// Platform ticket the client presents in its login handshake.
    pub ticket: String,
    pub id: i32,
    pub username: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub user_groups: i64,
    #[serde(default)]
    pub privileges: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthConfig {
    /// Accept unknown tickets as guests, using the ticket as the username
    #[serde(default = "default_allow_guests")]
    pub allow_guests: bool,
    /// First numeric id handed out to guests
    #[serde(default = "default_guest_id_start")]
    pub guest_id_start: i32,
    /// Client build signatures accepted at login. Empty accepts any build.
    #[serde(default)]
    pub accepted_signatures: Vec<String>,
    #[serde(default)]
    pub users: Vec<StaticUserEntry>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_guests: default_allow_guests(),
            guest_id_start: default_guest_id_start(),
            accepted_signatures: Vec::new(),
            users: Vec::new(),
        }
    }
}
