use cadence_server::config::Config;
use cadence_server::protocol::{ServerPacket, UserId, UserInfo};
use cadence_server::server::GameServer;
use cadence_server::session::UserSession;
use std::sync::Arc;
use tokio::sync::mpsc;

pub type Inbox = mpsc::Receiver<Arc<ServerPacket>>;

/// Configuration tuned for tests: short countdown, fast housekeeping.
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.multiplayer.countdown_ms = 100;
    config.server.ping_interval_secs = 1;
    config.server.ping_timeout_secs = 5;
    config.server.cleanup_interval_secs = 1;
    config
}

/// Create a test server with in-memory collaborators
#[allow(dead_code)]
pub async fn create_test_server() -> Arc<GameServer> {
    create_test_server_with_config(test_config()).await
}

#[allow(dead_code)]
pub async fn create_test_server_with_config(config: Config) -> Arc<GameServer> {
    GameServer::new(Arc::new(config))
        .await
        .expect("Failed to create test server")
}

#[allow(dead_code)]
pub fn test_user(id: UserId) -> UserInfo {
    UserInfo {
        id,
        username: format!("tester{id}"),
        country: "NL".to_string(),
        user_groups: 0,
        privileges: 0,
    }
}

/// Register a user directly, bypassing the socket.
#[allow(dead_code)]
pub async fn connect_user(server: &GameServer, id: UserId) -> (Arc<UserSession>, Inbox) {
    let (tx, rx) = mpsc::channel(256);
    let session = server
        .login(test_user(id), uuid::Uuid::new_v4(), tx)
        .await
        .expect("login should succeed");
    (session, rx)
}

/// Feed one JSON frame through the packet router for `session`.
#[allow(dead_code)]
pub async fn send_frame(server: &GameServer, session: &UserSession, frame: serde_json::Value) -> bool {
    server
        .dispatch(session.connection_id(), &frame.to_string())
        .await
}

#[allow(dead_code)]
pub fn drain(inbox: &mut Inbox) -> Vec<Arc<ServerPacket>> {
    let mut packets = Vec::new();
    while let Ok(packet) = inbox.try_recv() {
        packets.push(packet);
    }
    packets
}
