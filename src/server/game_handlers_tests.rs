use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::json;

use super::test_support::{drain, ids, login, send, server};
use crate::protocol::{JoinGameError, NotificationKind, PacketId, ServerPacket};

#[tokio::test]
async fn create_and_join_through_frames() {
    let server = server().await;
    let (host, mut host_inbox) = login(&server, 1).await;
    let (guest, mut guest_inbox) = login(&server, 2).await;
    let (late, mut late_inbox) = login(&server, 3).await;

    let create = json!({"id": 110, "game": {"name": "Cup", "password": "pw", "max_players": 2}});
    assert!(send(&server, &host, create).await);
    let game_id = host.current_game().expect("creator is in the game");
    let created = drain(&mut host_inbox);
    match created.last().map(|packet| packet.as_ref()) {
        Some(ServerPacket::GameJoinSuccess(payload)) => {
            assert_eq!(payload.game.id, game_id);
            assert!(payload.game.has_password);
            assert_eq!(payload.game.max_players, 2);
        }
        other => panic!("expected join success, got {other:?}"),
    }

    drain(&mut guest_inbox);
    let wrong = json!({"id": 111, "game_id": game_id, "password": "nope"});
    assert!(send(&server, &guest, wrong).await);
    match drain(&mut guest_inbox).first().map(|packet| packet.as_ref()) {
        Some(ServerPacket::GameJoinFailed(payload)) => {
            assert_eq!(payload.reason, JoinGameError::Password)
        }
        other => panic!("expected join failure, got {other:?}"),
    }

    let right = json!({"id": 111, "game_id": game_id, "password": "pw"});
    assert!(send(&server, &guest, right).await);
    assert_eq!(guest.current_game(), Some(game_id));
    assert!(ids(&drain(&mut guest_inbox)).contains(&PacketId::ServerGameJoinSuccess));
    assert!(ids(&drain(&mut host_inbox)).contains(&PacketId::ServerGamePlayerJoined));

    drain(&mut late_inbox);
    let full = json!({"id": 111, "game_id": game_id, "password": "pw"});
    assert!(send(&server, &late, full).await);
    match drain(&mut late_inbox).first().map(|packet| packet.as_ref()) {
        Some(ServerPacket::GameJoinFailed(payload)) => {
            assert_eq!(payload.reason, JoinGameError::Full)
        }
        other => panic!("expected join failure, got {other:?}"),
    }
    assert_eq!(late.current_game(), None);
}

#[tokio::test]
async fn countdown_and_match_through_frames() {
    let server = server().await;
    let (host, mut host_inbox) = login(&server, 1).await;
    let (guest, mut guest_inbox) = login(&server, 2).await;
    let create = json!({
        "id": 110,
        "game": {"name": "Run", "map": {"md5": "abc", "difficulty_rating": 12.5}}
    });
    assert!(send(&server, &host, create).await);
    let game_id = host.current_game().expect("game");
    assert!(send(&server, &guest, json!({"id": 111, "game_id": game_id})).await);
    drain(&mut host_inbox);
    drain(&mut guest_inbox);

    // Only the host may start the countdown.
    assert!(send(&server, &guest, json!({"id": 127})).await);
    assert!(drain(&mut host_inbox).is_empty());

    assert!(send(&server, &host, json!({"id": 127})).await);
    assert_eq!(
        ids(&drain(&mut guest_inbox)),
        vec![PacketId::ServerGameCountdownStarted]
    );
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        ids(&drain(&mut guest_inbox)),
        vec![PacketId::ServerGameStarted]
    );
    drain(&mut host_inbox);

    let judgements = json!({"id": 142, "judgements": [0, 0, 1, 5]});
    assert!(send(&server, &guest, judgements).await);
    assert_eq!(
        ids(&drain(&mut host_inbox)),
        vec![PacketId::ServerGameJudgements]
    );

    assert!(send(&server, &guest, json!({"id": 143})).await);
    assert!(send(&server, &host, json!({"id": 143})).await);
    let ended = drain(&mut guest_inbox);
    let result = ended.iter().find_map(|packet| match packet.as_ref() {
        ServerPacket::GameEnded(payload) => Some(payload.clone()),
        _ => None,
    });
    let result = result.expect("match ended");
    assert_eq!(result.scores.len(), 2);
    assert_eq!(result.player_wins.get(&2), Some(&1));
    assert_eq!(
        server.metrics().matches_finished.load(Ordering::Relaxed),
        1
    );
}

#[tokio::test]
async fn game_packets_without_a_game_do_nothing() {
    let server = server().await;
    let (session, mut inbox) = login(&server, 1).await;
    drain(&mut inbox);

    assert!(send(&server, &session, json!({"id": 114, "name": "renamed"})).await);
    assert!(send(&server, &session, json!({"id": 125})).await);
    assert!(send(&server, &session, json!({"id": 112})).await);
    assert!(drain(&mut inbox).is_empty());
}

#[tokio::test]
async fn creation_limit_is_reported_as_notification() {
    let server = server().await;
    let limit = server.config().multiplayer.max_concurrent_games;
    let mut hosts = Vec::new();
    for user_id in 1..=limit as i32 {
        let (host, _inbox) = login(&server, user_id).await;
        assert!(send(&server, &host, json!({"id": 110, "game": {"name": "busy"}})).await);
        hosts.push(host);
    }
    assert_eq!(server.engine().active_games(), limit);

    let (extra, mut extra_inbox) = login(&server, 100).await;
    drain(&mut extra_inbox);
    assert!(send(&server, &extra, json!({"id": 110, "game": {"name": "one more"}})).await);
    match drain(&mut extra_inbox).first().map(|packet| packet.as_ref()) {
        Some(ServerPacket::Notification(payload)) => {
            assert_eq!(payload.kind, NotificationKind::Error)
        }
        other => panic!("expected a notification, got {other:?}"),
    }
    assert_eq!(extra.current_game(), None);
}

#[tokio::test]
async fn host_kicks_and_invites_through_frames() {
    let server = server().await;
    let (host, _host_inbox) = login(&server, 1).await;
    let (guest, mut guest_inbox) = login(&server, 2).await;
    let (friend, mut friend_inbox) = login(&server, 3).await;
    assert!(send(&server, &host, json!({"id": 110, "game": {"name": "Room"}})).await);
    let game_id = host.current_game().expect("game");
    assert!(send(&server, &guest, json!({"id": 111, "game_id": game_id})).await);
    drain(&mut guest_inbox);
    drain(&mut friend_inbox);

    assert!(send(&server, &host, json!({"id": 133, "user_id": 2})).await);
    assert!(ids(&drain(&mut guest_inbox)).contains(&PacketId::ServerGameKicked));
    assert_eq!(guest.current_game(), None);

    assert!(send(&server, &host, json!({"id": 144, "user_id": 3})).await);
    match drain(&mut friend_inbox).first().map(|packet| packet.as_ref()) {
        Some(ServerPacket::GameInvite(payload)) => {
            assert_eq!(payload.game_id, game_id);
            assert_eq!(payload.sender_id, 1);
            assert_eq!(payload.game_name, "Room");
        }
        other => panic!("expected an invite, got {other:?}"),
    }
    assert_eq!(friend.current_game(), None);
}
