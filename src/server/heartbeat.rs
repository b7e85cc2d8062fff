use std::sync::Arc;

use super::GameServer;
use crate::protocol::messages::ClientPong;
use crate::protocol::ServerPacket;
use crate::session::UserSession;

impl GameServer {
    pub fn send_ping(&self, session: &UserSession) -> bool {
        session.send(Arc::new(ServerPacket::Ping {}))
    }

    /// Record the heartbeat. A pong without process diagnostics is reported
    /// but never acted on.
    pub(super) async fn handle_pong(&self, session: &Arc<UserSession>, packet: Option<ClientPong>) {
        let Some(pong) = packet else {
            return;
        };
        session.record_pong();

        if pong.processes.is_empty() {
            tracing::warn!(
                user_id = session.id(),
                username = %session.username(),
                "Heartbeat carried no process diagnostics"
            );
        } else {
            tracing::trace!(
                user_id = session.id(),
                processes = pong.processes.len(),
                "Heartbeat received"
            );
        }
    }
}
