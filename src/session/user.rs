use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::protocol::{ClientStatus, ConnectionId, GameId, ServerPacket, UserId, UserInfo};

/// Outbound half of a connection's bounded packet queue.
pub type PacketSender = mpsc::Sender<Arc<ServerPacket>>;

const NO_GAME: i64 = -1;

/// One logged-in user bound to one live connection.
#[derive(Debug)]
pub struct UserSession {
    info: UserInfo,
    connection_id: ConnectionId,
    token: String,
    sender: PacketSender,
    status: RwLock<ClientStatus>,
    /// Advisory back-reference to the game the user occupies. Always
    /// re-resolve through the engine before acting on it.
    current_game: AtomicI64,
    last_pong_millis: AtomicI64,
    closed: CancellationToken,
}

impl UserSession {
    pub fn new(info: UserInfo, connection_id: ConnectionId, sender: PacketSender) -> Self {
        Self {
            info,
            connection_id,
            token: Uuid::new_v4().to_string(),
            sender,
            status: RwLock::new(ClientStatus::default()),
            current_game: AtomicI64::new(NO_GAME),
            last_pong_millis: AtomicI64::new(chrono::Utc::now().timestamp_millis()),
            closed: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> UserId {
        self.info.id
    }

    pub fn username(&self) -> &str {
        &self.info.username
    }

    pub fn info(&self) -> &UserInfo {
        &self.info
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Queue a packet without waiting. Returns false when the queue is full
    /// or the connection is gone.
    pub fn send(&self, packet: Arc<ServerPacket>) -> bool {
        match self.sender.try_send(packet) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    user_id = self.info.id,
                    connection_id = %self.connection_id,
                    error = %err,
                    "Failed to queue packet for user"
                );
                false
            }
        }
    }

    pub async fn status(&self) -> ClientStatus {
        self.status.read().await.clone()
    }

    pub async fn set_status(&self, status: ClientStatus) {
        *self.status.write().await = status;
    }

    pub fn current_game(&self) -> Option<GameId> {
        match self.current_game.load(Ordering::Acquire) {
            NO_GAME => None,
            id => Some(id),
        }
    }

    pub fn set_current_game(&self, game_id: Option<GameId>) {
        self.current_game
            .store(game_id.unwrap_or(NO_GAME), Ordering::Release);
    }

    /// Clear the back-reference only if it still points at `game_id`.
    pub fn clear_current_game_if(&self, game_id: GameId) -> bool {
        self.current_game
            .compare_exchange(game_id, NO_GAME, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn record_pong(&self) {
        self.last_pong_millis
            .store(chrono::Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn millis_since_pong(&self, now_millis: i64) -> i64 {
        now_millis - self.last_pong_millis.load(Ordering::Relaxed)
    }

    /// Signal the connection task to close the transport.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (UserSession, mpsc::Receiver<Arc<ServerPacket>>) {
        let (tx, rx) = mpsc::channel(1);
        let info = UserInfo {
            id: 7,
            username: "Keysmash".to_string(),
            country: "NL".to_string(),
            user_groups: 0,
            privileges: 1,
        };
        (UserSession::new(info, Uuid::new_v4(), tx), rx)
    }

    #[test]
    fn game_back_reference_is_compare_and_clear() {
        let (session, _rx) = session();
        assert_eq!(session.current_game(), None);

        session.set_current_game(Some(12));
        assert!(!session.clear_current_game_if(13));
        assert_eq!(session.current_game(), Some(12));
        assert!(session.clear_current_game_if(12));
        assert_eq!(session.current_game(), None);
    }

    #[tokio::test]
    async fn send_reports_full_queue() {
        let (session, mut rx) = session();
        assert!(session.send(Arc::new(ServerPacket::Ping {})));
        assert!(!session.send(Arc::new(ServerPacket::Ping {})));
        assert!(rx.recv().await.is_some());
    }

    #[test]
    fn close_cancels_token() {
        let (session, _rx) = session();
        let token = session.closed_token();
        assert!(!token.is_cancelled());
        session.close();
        assert!(token.is_cancelled());
        assert_eq!(session.token().len(), 36);
    }
}
