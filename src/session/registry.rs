use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::user::UserSession;
use crate::metrics::ServerMetrics;
use crate::protocol::{ConnectionId, ServerPacket, UserId};

#[derive(Debug, Error)]
pub enum RegisterSessionError {
    #[error("user {user_id} is already online")]
    AlreadyOnline {
        user_id: UserId,
        existing: Arc<UserSession>,
    },
    #[error("username `{username}` is held by another online user")]
    UsernameTaken { username: String },
}

#[derive(Default)]
struct SessionIndexes {
    by_id: HashMap<UserId, Arc<UserSession>>,
    by_username: HashMap<String, UserId>,
    by_connection: HashMap<ConnectionId, UserId>,
}

impl SessionIndexes {
    fn detach(&mut self, user_id: UserId) -> Option<Arc<UserSession>> {
        let session = self.by_id.remove(&user_id)?;
        self.by_username.remove(&normalize(session.username()));
        self.by_connection.remove(&session.connection_id());
        Some(session)
    }
}

fn normalize(username: &str) -> String {
    username.to_lowercase()
}

/// Directory of every logged-in user.
///
/// The three indexes share one lock, so no caller can observe a session that
/// is present in one index but missing from another. The lock is never held
/// while a packet is queued.
pub struct SessionRegistry {
    indexes: RwLock<SessionIndexes>,
    metrics: Arc<ServerMetrics>,
}

impl SessionRegistry {
    pub fn new(metrics: Arc<ServerMetrics>) -> Self {
        Self {
            indexes: RwLock::new(SessionIndexes::default()),
            metrics,
        }
    }

    pub async fn add(&self, session: Arc<UserSession>) -> Result<(), RegisterSessionError> {
        let mut indexes = self.indexes.write().await;
        let user_id = session.id();
        if let Some(existing) = indexes.by_id.get(&user_id) {
            return Err(RegisterSessionError::AlreadyOnline {
                user_id,
                existing: existing.clone(),
            });
        }
        let username = normalize(session.username());
        if indexes.by_username.contains_key(&username) {
            return Err(RegisterSessionError::UsernameTaken {
                username: session.username().to_string(),
            });
        }

        indexes.by_username.insert(username, user_id);
        indexes
            .by_connection
            .insert(session.connection_id(), user_id);
        indexes.by_id.insert(user_id, session);
        Ok(())
    }

    pub async fn remove(&self, user_id: UserId) -> Option<Arc<UserSession>> {
        self.indexes.write().await.detach(user_id)
    }

    /// Remove whichever session is bound to `connection_id`. A connection
    /// that was already superseded by a newer login removes nothing.
    pub async fn remove_connection(&self, connection_id: ConnectionId) -> Option<Arc<UserSession>> {
        let mut indexes = self.indexes.write().await;
        let user_id = *indexes.by_connection.get(&connection_id)?;
        indexes.detach(user_id)
    }

    pub async fn by_id(&self, user_id: UserId) -> Option<Arc<UserSession>> {
        self.indexes.read().await.by_id.get(&user_id).cloned()
    }

    pub async fn by_username(&self, username: &str) -> Option<Arc<UserSession>> {
        let indexes = self.indexes.read().await;
        let user_id = indexes.by_username.get(&normalize(username))?;
        indexes.by_id.get(user_id).cloned()
    }

    pub async fn by_connection(&self, connection_id: ConnectionId) -> Option<Arc<UserSession>> {
        let indexes = self.indexes.read().await;
        let user_id = indexes.by_connection.get(&connection_id)?;
        indexes.by_id.get(user_id).cloned()
    }

    pub async fn online_count(&self) -> usize {
        self.indexes.read().await.by_id.len()
    }

    pub async fn online_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.indexes.read().await.by_id.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub async fn snapshot(&self) -> Vec<Arc<UserSession>> {
        self.indexes.read().await.by_id.values().cloned().collect()
    }

    /// Best-effort delivery to every user online at call time.
    pub async fn broadcast(&self, packet: ServerPacket) -> usize {
        let recipients = self.snapshot().await;
        self.deliver(recipients, Arc::new(packet))
    }

    pub async fn broadcast_except(&self, packet: ServerPacket, except: UserId) -> usize {
        let recipients: Vec<_> = {
            let indexes = self.indexes.read().await;
            indexes
                .by_id
                .values()
                .filter(|session| session.id() != except)
                .cloned()
                .collect()
        };
        self.deliver(recipients, Arc::new(packet))
    }

    /// Deliver to the listed users that are online; absent ids are skipped.
    pub async fn send_to(&self, packet: ServerPacket, user_ids: &[UserId]) -> usize {
        if user_ids.is_empty() {
            return 0;
        }
        self.send_arc_to(Arc::new(packet), user_ids).await
    }

    pub async fn send_arc_to(&self, packet: Arc<ServerPacket>, user_ids: &[UserId]) -> usize {
        let recipients: Vec<_> = {
            let indexes = self.indexes.read().await;
            user_ids
                .iter()
                .filter_map(|user_id| indexes.by_id.get(user_id).cloned())
                .collect()
        };
        self.deliver(recipients, packet)
    }

    fn deliver(&self, recipients: Vec<Arc<UserSession>>, packet: Arc<ServerPacket>) -> usize {
        let mut delivered = 0;
        for session in recipients {
            if session.send(Arc::clone(&packet)) {
                delivered += 1;
            } else {
                self.metrics.increment_send_failures();
            }
        }
        debug!(packet = %packet.id(), delivered, "Delivered packet");
        delivered
    }

    /// Remove sessions whose last pong is older than `timeout_millis`.
    pub async fn take_stale(&self, now_millis: i64, timeout_millis: i64) -> Vec<Arc<UserSession>> {
        let mut indexes = self.indexes.write().await;
        let stale: Vec<UserId> = indexes
            .by_id
            .values()
            .filter(|session| session.millis_since_pong(now_millis) > timeout_millis)
            .map(|session| session.id())
            .collect();
        let removed: Vec<_> = stale
            .into_iter()
            .filter_map(|user_id| indexes.detach(user_id))
            .collect();
        if !removed.is_empty() {
            warn!(count = removed.len(), "Dropping sessions with stale heartbeats");
        }
        removed
    }
}
