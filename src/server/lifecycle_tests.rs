use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::test_support::{drain, ids, login, server, user};
use crate::auth::{AuthError, HandshakeError, LoginHandshake};
use crate::protocol::messages::GameSettingsPayload;
use crate::protocol::{PacketId, ServerPacket};
use crate::session::RegisterSessionError;

fn settings(name: &str) -> GameSettingsPayload {
    GameSettingsPayload {
        name: name.to_string(),
        ..GameSettingsPayload::default()
    }
}

#[tokio::test]
async fn login_replies_to_user_and_announces_to_others() {
    let server = server().await;
    let (_first, mut first_inbox) = login(&server, 1).await;
    drain(&mut first_inbox);

    let (second, mut second_inbox) = login(&server, 2).await;
    let reply = drain(&mut second_inbox);
    assert_eq!(ids(&reply), vec![PacketId::ServerLoginReply]);
    match reply[0].as_ref() {
        ServerPacket::LoginReply(payload) => {
            assert_eq!(payload.user.id, 2);
            assert_eq!(payload.online_users, 2);
            assert_eq!(payload.session_token, second.token());
        }
        other => panic!("unexpected packet {other:?}"),
    }

    assert_eq!(
        ids(&drain(&mut first_inbox)),
        vec![PacketId::ServerUserConnected]
    );
    assert_eq!(server.metrics().active_connections.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn duplicate_login_evicts_previous_connection() {
    let server = server().await;
    let (old, _old_inbox) = login(&server, 1).await;
    server.lobby().join(1).await;
    server
        .engine()
        .create(settings("evicted"), None, 1)
        .await
        .expect("create");
    assert_eq!(server.engine().active_games(), 1);

    let (new, _new_inbox) = login(&server, 1).await;

    assert!(old.closed_token().is_cancelled());
    assert!(!new.closed_token().is_cancelled());
    let current = server.sessions().by_id(1).await.expect("new session online");
    assert!(Arc::ptr_eq(&current, &new));
    assert!(!server.lobby().contains(1).await);
    assert_eq!(server.engine().active_games(), 0);
    assert_eq!(server.metrics().duplicate_logins.load(Ordering::Relaxed), 1);

    // The evicted connection task reports its close later; nothing happens.
    assert!(!server.disconnect(&old).await);
    assert!(server.sessions().by_id(1).await.is_some());
}

#[tokio::test]
async fn username_collision_is_rejected() {
    let server = server().await;
    let (_first, _inbox) = login(&server, 1).await;

    let mut clash = user(2);
    clash.username = "PLAYER1".to_string();
    let (tx, _rx) = mpsc::channel(4);
    let result = server.login(clash, Uuid::new_v4(), tx).await;
    assert!(matches!(
        result,
        Err(RegisterSessionError::UsernameTaken { .. })
    ));
    assert_eq!(server.metrics().login_failures.load(Ordering::Relaxed), 1);
    assert_eq!(server.sessions().online_count().await, 1);
}

#[tokio::test]
async fn disconnect_leaves_lobby_and_games() {
    let server = server().await;
    let (host, _host_inbox) = login(&server, 1).await;
    let (_guest, mut guest_inbox) = login(&server, 2).await;
    let game = server
        .engine()
        .create(settings("shared"), None, 1)
        .await
        .expect("create");
    server
        .engine()
        .add_player(game.id, 2, None)
        .await
        .expect("join");
    server.lobby().join(1).await;
    drain(&mut guest_inbox);

    assert!(server.disconnect(&host).await);

    assert!(!server.lobby().contains(1).await);
    assert!(server.sessions().by_id(1).await.is_none());
    let view = server.engine().game_view(game.id).await.expect("game survives");
    assert_eq!(view.player_ids, vec![2]);
    assert_eq!(view.host_id, 2);

    let seen = ids(&drain(&mut guest_inbox));
    assert!(seen.contains(&PacketId::ServerGamePlayerLeft));
    assert!(seen.contains(&PacketId::ServerGameHostChanged));
    assert!(seen.contains(&PacketId::ServerUserDisconnected));

    assert!(!server.disconnect(&host).await);
}

#[tokio::test]
async fn login_handshake_is_decoded_and_verified() {
    let server = server().await;
    let encoded = LoginHandshake {
        ticket: "steam-ticket".to_string(),
        signature: String::new(),
    }
    .encode()
    .unwrap();

    let guest = server.authenticate_login(&encoded).await.unwrap();
    assert_eq!(guest.username, "Guest steam-ticket");

    assert!(matches!(
        server.authenticate_login("").await,
        Err(AuthError::Handshake(HandshakeError::Missing))
    ));
}

#[tokio::test]
async fn stale_sessions_are_swept_and_released() {
    let server = server().await;
    let (quiet, _quiet_inbox) = login(&server, 1).await;
    let (_other, mut other_inbox) = login(&server, 2).await;
    server.lobby().join(1).await;
    drain(&mut other_inbox);

    let now = chrono::Utc::now().timestamp_millis();
    assert_eq!(server.sweep_stale_sessions(now).await, 0);

    let later = now + 2 * 60_000;
    assert_eq!(server.sweep_stale_sessions(later).await, 2);
    assert!(quiet.closed_token().is_cancelled());
    assert!(!server.lobby().contains(1).await);
    assert_eq!(server.sessions().online_count().await, 0);
    assert_eq!(
        server.metrics().stale_sessions_cleaned.load(Ordering::Relaxed),
        2
    );
}

#[tokio::test]
async fn pong_refreshes_heartbeat() {
    let server = server().await;
    let (session, _inbox) = login(&server, 1).await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let now = chrono::Utc::now().timestamp_millis();
    let before = session.millis_since_pong(now);

    let frame = serde_json::json!({"id": 100, "processes": []});
    assert!(super::test_support::send(&server, &session, frame).await);
    assert!(session.millis_since_pong(now) < before);
}
