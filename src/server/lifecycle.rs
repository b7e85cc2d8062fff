use std::sync::Arc;
use std::time::Duration;

use super::GameServer;
use crate::auth::{AuthError, LoginHandshake};
use crate::protocol::messages::{LoginReplyPayload, UserIdPayload, UserPayload};
use crate::protocol::{ConnectionId, ServerPacket, UserInfo};
use crate::session::{PacketSender, RegisterSessionError, UserSession};

impl GameServer {
    /// Decode the `login` query value and verify it within the configured
    /// time limit.
    pub async fn authenticate_login(&self, encoded: &str) -> Result<UserInfo, AuthError> {
        let handshake = LoginHandshake::decode(encoded)?;
        let limit = Duration::from_secs(self.config.websocket.auth_timeout_secs);
        match tokio::time::timeout(limit, self.authenticator.authenticate(&handshake)).await {
            Ok(result) => result,
            Err(_) => Err(AuthError::Timeout),
        }
    }

    /// Register an authenticated connection. An older connection of the same
    /// user is closed and cleaned up first.
    pub async fn login(
        &self,
        user: UserInfo,
        connection_id: ConnectionId,
        sender: PacketSender,
    ) -> Result<Arc<UserSession>, RegisterSessionError> {
        let session = Arc::new(UserSession::new(user, connection_id, sender));

        if let Err(err) = self.sessions.add(session.clone()).await {
            let existing = match err {
                RegisterSessionError::AlreadyOnline { existing, .. } => existing,
                other => {
                    self.metrics.increment_login_failures();
                    tracing::warn!(user_id = session.id(), error = %other, "Login rejected");
                    return Err(other);
                }
            };
            self.metrics.increment_duplicate_logins();
            tracing::warn!(
                user_id = session.id(),
                old_connection = %existing.connection_id(),
                new_connection = %connection_id,
                "Duplicate login, evicting previous connection"
            );
            existing.close();
            self.disconnect(&existing).await;
            self.sessions.add(session.clone()).await?;
        }

        self.metrics.increment_connections();
        let online_users = self.sessions.online_count().await;
        session.send(Arc::new(ServerPacket::LoginReply(LoginReplyPayload {
            user: session.info().clone(),
            session_token: session.token().to_string(),
            online_users,
        })));
        self.sessions
            .broadcast_except(
                ServerPacket::UserConnected(UserPayload {
                    user: session.info().clone(),
                }),
                session.id(),
            )
            .await;

        tracing::info!(
            user_id = session.id(),
            username = %session.username(),
            %connection_id,
            online_users,
            "User logged in"
        );
        Ok(session)
    }

    /// Tear down a connection's session. A session already superseded or
    /// swept by the heartbeat check is left alone.
    pub async fn disconnect(&self, session: &Arc<UserSession>) -> bool {
        let Some(removed) = self
            .sessions
            .remove_connection(session.connection_id())
            .await
        else {
            tracing::debug!(
                user_id = session.id(),
                connection_id = %session.connection_id(),
                "Connection already released"
            );
            return false;
        };
        self.release_session(&removed).await;
        true
    }

    /// Cleanup for a session that is no longer in the registry: leave the
    /// lobby and every game, then tell the remaining users.
    pub(super) async fn release_session(&self, session: &Arc<UserSession>) {
        let user_id = session.id();
        self.lobby.leave(user_id).await;
        let games_left = self.engine.remove_user_everywhere(user_id).await;
        self.metrics.decrement_active_connections();
        self.sessions
            .broadcast(ServerPacket::UserDisconnected(UserIdPayload { user_id }))
            .await;
        tracing::info!(user_id, games_left, "User disconnected");
    }
}
