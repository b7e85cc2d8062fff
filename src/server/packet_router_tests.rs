use std::sync::atomic::Ordering;

use serde_json::json;
use uuid::Uuid;

use super::packet_router::handler_for;
use super::test_support::{drain, ids, login, send, server};
use crate::protocol::{ClientActivity, Direction, PacketId, ServerPacket};

#[test]
fn only_client_packets_have_handlers() {
    for id in PacketId::ALL {
        if id.direction() == Direction::Server {
            assert!(handler_for(*id).is_none(), "{id} must not be routable");
        }
    }
    assert!(handler_for(PacketId::ClientJoinGame).is_some());
    assert!(handler_for(PacketId::ClientGameStartCountdown).is_some());
    assert!(handler_for(PacketId::ClientPong).is_some());
    assert!(handler_for(PacketId::ClientChatMessage).is_none());
}

#[tokio::test]
async fn frames_from_unknown_connections_are_dropped() {
    let server = server().await;
    let handled = server
        .dispatch(Uuid::new_v4(), r#"{"id":108}"#)
        .await;
    assert!(!handled);
    assert_eq!(
        server.metrics().unauthenticated_packets.load(Ordering::Relaxed),
        1
    );
    assert!(server.lobby().is_empty().await);
}

#[tokio::test]
async fn malformed_and_misdirected_frames_are_dropped() {
    let server = server().await;
    let (session, mut inbox) = login(&server, 1).await;
    drain(&mut inbox);

    assert!(!server.dispatch(session.connection_id(), "{not json").await);
    assert!(!send(&server, &session, json!({"id": 4242})).await);
    assert!(!send(&server, &session, json!({"id": 16, "game": {}})).await);
    assert!(!send(&server, &session, json!({"id": 101, "message": "hi"})).await);

    assert_eq!(server.metrics().packets_dropped.load(Ordering::Relaxed), 4);
    assert!(drain(&mut inbox).is_empty());
}

#[tokio::test]
async fn undecodable_body_runs_handler_as_no_op() {
    let server = server().await;
    let (session, mut inbox) = login(&server, 1).await;
    drain(&mut inbox);

    assert!(send(&server, &session, json!({"id": 111, "game_id": "twelve"})).await);
    assert!(drain(&mut inbox).is_empty());
    assert_eq!(server.metrics().packets_handled.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn status_update_is_broadcast_to_everyone() {
    let server = server().await;
    let (session, mut own_inbox) = login(&server, 1).await;
    let (_other, mut other_inbox) = login(&server, 2).await;
    drain(&mut own_inbox);
    drain(&mut other_inbox);

    let frame = json!({"id": 104, "status": {"activity": 1, "map_id": 55}});
    assert!(send(&server, &session, frame).await);

    assert_eq!(session.status().await.activity, ClientActivity::Playing);
    for inbox in [&mut own_inbox, &mut other_inbox] {
        let packets = drain(inbox);
        match packets.first().map(|packet| packet.as_ref()) {
            Some(ServerPacket::UserStatus(payload)) => {
                assert_eq!(payload.statuses.get(&1).map(|s| s.map_id), Some(55));
            }
            other => panic!("expected a status broadcast, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn user_queries_return_only_online_users() {
    let server = server().await;
    let (session, mut inbox) = login(&server, 1).await;
    let (_other, _other_inbox) = login(&server, 2).await;
    drain(&mut inbox);

    assert!(send(&server, &session, json!({"id": 105, "user_ids": [2, 99]})).await);
    assert!(send(&server, &session, json!({"id": 152})).await);

    let packets = drain(&mut inbox);
    match packets[0].as_ref() {
        ServerPacket::UserInfo(payload) => {
            assert_eq!(payload.users.len(), 1);
            assert_eq!(payload.users[0].id, 2);
        }
        other => panic!("unexpected packet {other:?}"),
    }
    match packets[1].as_ref() {
        ServerPacket::UsersOnline(payload) => assert_eq!(payload.user_ids, vec![1, 2]),
        other => panic!("unexpected packet {other:?}"),
    }
}

#[tokio::test]
async fn lobby_join_lists_active_games() {
    let server = server().await;
    let (host, mut host_inbox) = login(&server, 1).await;
    let (browser, mut browser_inbox) = login(&server, 2).await;
    assert!(send(&server, &host, json!({"id": 110, "game": {"name": "first"}})).await);
    assert!(send(&server, &host, json!({"id": 110, "game": {"name": "second"}})).await);
    drain(&mut host_inbox);
    drain(&mut browser_inbox);

    assert!(send(&server, &browser, json!({"id": 108})).await);
    assert!(server.lobby().contains(2).await);
    // Creating the second game left the first, which disbanded it.
    assert_eq!(
        ids(&drain(&mut browser_inbox)),
        vec![PacketId::ServerGameInfo]
    );

    assert!(send(&server, &browser, json!({"id": 109})).await);
    assert!(!server.lobby().contains(2).await);
}
