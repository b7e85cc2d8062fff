//! Static login verification.
//!
//! Accounts are loaded from configuration at startup. Unknown tickets are
//! admitted as guests when guests are allowed, reusing the same guest id for
//! the same ticket for the lifetime of the process.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};

use super::error::AuthError;
use super::handshake::LoginHandshake;
use crate::config::AuthConfig;
use crate::protocol::UserInfo;

const MAX_GUEST_NAME_CHARS: usize = 24;

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify a handshake and resolve the user it identifies.
    async fn authenticate(&self, handshake: &LoginHandshake) -> Result<UserInfo, AuthError>;
}

pub struct StaticAuthenticator {
    users: HashMap<String, UserInfo>,
    accepted_signatures: HashSet<String>,
    allow_guests: bool,
    next_guest_id: AtomicI32,
    guests: DashMap<String, UserInfo>,
}

impl StaticAuthenticator {
    pub fn new(config: &AuthConfig) -> Self {
        let users = config
            .users
            .iter()
            .map(|entry| {
                (
                    entry.ticket.clone(),
                    UserInfo {
                        id: entry.id,
                        username: entry.username.clone(),
                        country: entry.country.clone(),
                        user_groups: entry.user_groups,
                        privileges: entry.privileges,
                    },
                )
            })
            .collect();

        Self {
            users,
            accepted_signatures: config.accepted_signatures.iter().cloned().collect(),
            allow_guests: config.allow_guests,
            next_guest_id: AtomicI32::new(config.guest_id_start),
            guests: DashMap::new(),
        }
    }

    fn guest_for(&self, ticket: &str) -> UserInfo {
        self.guests
            .entry(ticket.to_string())
            .or_insert_with(|| {
                let id = self.next_guest_id.fetch_add(1, Ordering::Relaxed);
                let name: String = ticket.trim().chars().take(MAX_GUEST_NAME_CHARS).collect();
                UserInfo {
                    id,
                    username: format!("Guest {name}"),
                    country: String::new(),
                    user_groups: 0,
                    privileges: 0,
                }
            })
            .value()
            .clone()
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, handshake: &LoginHandshake) -> Result<UserInfo, AuthError> {
        if !self.accepted_signatures.is_empty()
            && !self.accepted_signatures.contains(&handshake.signature)
        {
            return Err(AuthError::UnsupportedClient);
        }

        if let Some(user) = self.users.get(&handshake.ticket) {
            return Ok(user.clone());
        }

        if self.allow_guests {
            return Ok(self.guest_for(&handshake.ticket));
        }

        Err(AuthError::InvalidCredentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticUserEntry;

    fn handshake(ticket: &str, signature: &str) -> LoginHandshake {
        LoginHandshake {
            ticket: ticket.to_string(),
            signature: signature.to_string(),
        }
    }

    fn config() -> AuthConfig {
        AuthConfig {
            allow_guests: false,
            guest_id_start: 500,
            accepted_signatures: Vec::new(),
            users: vec![StaticUserEntry {
                ticket: "known".to_string(),
                id: 3,
                username: "Charter".to_string(),
                country: "JP".to_string(),
                user_groups: 2,
                privileges: 1,
            }],
        }
    }

    #[tokio::test]
    async fn known_ticket_resolves_configured_user() {
        let auth = StaticAuthenticator::new(&config());
        let user = auth.authenticate(&handshake("known", "")).await.unwrap();
        assert_eq!(user.id, 3);
        assert_eq!(user.username, "Charter");
        assert!(matches!(
            auth.authenticate(&handshake("unknown", "")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn guests_get_stable_ids_per_ticket() {
        let mut cfg = config();
        cfg.allow_guests = true;
        let auth = StaticAuthenticator::new(&cfg);
        let first = auth.authenticate(&handshake("alpha", "")).await.unwrap();
        let again = auth.authenticate(&handshake("alpha", "")).await.unwrap();
        let other = auth.authenticate(&handshake("beta", "")).await.unwrap();
        assert_eq!(first.id, 500);
        assert_eq!(again.id, 500);
        assert_eq!(other.id, 501);
        assert_eq!(first.username, "Guest alpha");
    }

    #[tokio::test]
    async fn signatures_are_enforced_when_configured() {
        let mut cfg = config();
        cfg.accepted_signatures = vec!["release-1".to_string()];
        let auth = StaticAuthenticator::new(&cfg);
        assert!(matches!(
            auth.authenticate(&handshake("known", "dev")).await,
            Err(AuthError::UnsupportedClient)
        ));
        assert!(auth
            .authenticate(&handshake("known", "release-1"))
            .await
            .is_ok());
    }
}
