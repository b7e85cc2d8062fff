use std::collections::BTreeMap;
use std::sync::Arc;

use super::GameServer;
use crate::protocol::messages::{
    ClientEmpty, ClientStatusUpdate, ClientUserListRequest, GamePayload, UserInfoListPayload,
    UserListPayload, UserStatusPayload,
};
use crate::protocol::ServerPacket;
use crate::session::UserSession;

/// Upper bound on the ids honoured from a single user query.
const MAX_QUERY_USERS: usize = 256;

impl GameServer {
    pub(super) async fn handle_status_update(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientStatusUpdate>,
    ) {
        let Some(update) = packet else {
            return;
        };
        session.set_status(update.status.clone()).await;

        let mut statuses = BTreeMap::new();
        statuses.insert(session.id(), update.status);
        self.sessions
            .broadcast(ServerPacket::UserStatus(UserStatusPayload { statuses }))
            .await;
    }

    pub(super) async fn handle_user_info_request(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientUserListRequest>,
    ) {
        let Some(request) = packet else {
            return;
        };
        let mut users = Vec::new();
        for user_id in request.user_ids.iter().take(MAX_QUERY_USERS) {
            if let Some(online) = self.sessions.by_id(*user_id).await {
                users.push(online.info().clone());
            }
        }
        session.send(Arc::new(ServerPacket::UserInfo(UserInfoListPayload { users })));
    }

    pub(super) async fn handle_user_status_request(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientUserListRequest>,
    ) {
        let Some(request) = packet else {
            return;
        };
        let mut statuses = BTreeMap::new();
        for user_id in request.user_ids.iter().take(MAX_QUERY_USERS) {
            if let Some(online) = self.sessions.by_id(*user_id).await {
                statuses.insert(*user_id, online.status().await);
            }
        }
        session.send(Arc::new(ServerPacket::UserStatus(UserStatusPayload {
            statuses,
        })));
    }

    pub(super) async fn handle_users_online(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientEmpty>,
    ) {
        if packet.is_none() {
            return;
        }
        let user_ids = self.sessions.online_ids().await;
        session.send(Arc::new(ServerPacket::UsersOnline(UserListPayload {
            user_ids,
        })));
    }

    /// Enter the match browser and receive the current list of games.
    pub(super) async fn handle_lobby_join(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientEmpty>,
    ) {
        if packet.is_none() {
            return;
        }
        if !self.lobby.join(session.id()).await {
            tracing::debug!(user_id = session.id(), "Lobby join repeated, resending games");
        }
        let games = self.engine.game_views().await;
        tracing::debug!(user_id = session.id(), games = games.len(), "User joined lobby");
        for game in games {
            session.send(Arc::new(ServerPacket::GameInfo(GamePayload { game })));
        }
    }

    pub(super) async fn handle_lobby_leave(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientEmpty>,
    ) {
        if packet.is_none() {
            return;
        }
        if self.lobby.leave(session.id()).await {
            tracing::debug!(user_id = session.id(), "User left lobby");
        }
    }
}
