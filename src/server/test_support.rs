use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::GameServer;
use crate::config::Config;
use crate::protocol::{PacketId, ServerPacket, UserId, UserInfo};
use crate::session::UserSession;

pub(super) type Inbox = mpsc::Receiver<Arc<ServerPacket>>;

pub(super) async fn server() -> Arc<GameServer> {
    let mut config = Config::default();
    config.multiplayer.countdown_ms = 50;
    config.multiplayer.max_concurrent_games = 4;
    GameServer::new(Arc::new(config))
        .await
        .expect("server construction")
}

pub(super) fn user(id: UserId) -> UserInfo {
    UserInfo {
        id,
        username: format!("player{id}"),
        country: "SE".to_string(),
        user_groups: 0,
        privileges: 0,
    }
}

pub(super) async fn login(server: &GameServer, id: UserId) -> (Arc<UserSession>, Inbox) {
    let (tx, rx) = mpsc::channel(128);
    let session = server
        .login(user(id), Uuid::new_v4(), tx)
        .await
        .expect("login");
    (session, rx)
}

pub(super) fn drain(inbox: &mut Inbox) -> Vec<Arc<ServerPacket>> {
    let mut packets = Vec::new();
    while let Ok(packet) = inbox.try_recv() {
        packets.push(packet);
    }
    packets
}

pub(super) fn ids(packets: &[Arc<ServerPacket>]) -> Vec<PacketId> {
    packets.iter().map(|packet| packet.id()).collect()
}

pub(super) async fn send(server: &GameServer, session: &UserSession, frame: serde_json::Value) -> bool {
    server
        .dispatch(session.connection_id(), &frame.to_string())
        .await
}
