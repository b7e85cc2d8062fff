//! Countdown and match lifecycle driven through the packet router.

mod test_helpers;

use cadence_server::multiplayer::MatchState;
use cadence_server::protocol::PacketId;
use serde_json::json;
use std::time::Duration;
use test_helpers::{connect_user, create_test_server, drain, send_frame, Inbox};

fn packet_ids(inbox: &mut Inbox) -> Vec<PacketId> {
    drain(inbox).iter().map(|packet| packet.id()).collect()
}

#[tokio::test]
async fn test_stopped_countdown_never_starts_the_match() {
    let server = create_test_server().await;
    let (host, mut host_inbox) = connect_user(&server, 1).await;
    let (guest, mut guest_inbox) = connect_user(&server, 2).await;
    assert!(send_frame(&server, &host, json!({"id": 110, "game": {"name": "Stop"}})).await);
    let game_id = host.current_game().expect("game");
    assert!(send_frame(&server, &guest, json!({"id": 111, "game_id": game_id})).await);
    drain(&mut host_inbox);
    drain(&mut guest_inbox);

    assert!(send_frame(&server, &host, json!({"id": 127})).await);
    assert!(send_frame(&server, &host, json!({"id": 128})).await);
    assert_eq!(
        packet_ids(&mut guest_inbox),
        vec![
            PacketId::ServerGameCountdownStarted,
            PacketId::ServerGameCountdownStopped
        ]
    );

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(packet_ids(&mut guest_inbox).is_empty());
    assert_eq!(
        server.engine().game_state(game_id).await,
        Some(MatchState::Idle)
    );
}

#[tokio::test]
async fn test_rearmed_countdown_starts_exactly_once() {
    let server = create_test_server().await;
    let (host, mut host_inbox) = connect_user(&server, 1).await;
    let (guest, mut guest_inbox) = connect_user(&server, 2).await;
    assert!(send_frame(&server, &host, json!({"id": 110, "game": {"name": "Again"}})).await);
    let game_id = host.current_game().expect("game");
    assert!(send_frame(&server, &guest, json!({"id": 111, "game_id": game_id})).await);
    drain(&mut host_inbox);
    drain(&mut guest_inbox);

    assert!(send_frame(&server, &host, json!({"id": 127})).await);
    assert!(send_frame(&server, &host, json!({"id": 128})).await);
    assert!(send_frame(&server, &host, json!({"id": 127})).await);
    // A second start while one is pending changes nothing.
    assert!(send_frame(&server, &host, json!({"id": 127})).await);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let started = packet_ids(&mut guest_inbox)
        .into_iter()
        .filter(|id| *id == PacketId::ServerGameStarted)
        .count();
    assert_eq!(started, 1);
    assert_eq!(
        server.engine().game_state(game_id).await,
        Some(MatchState::InProgress)
    );
}

#[tokio::test]
async fn test_host_disconnect_promotes_next_player() {
    let server = create_test_server().await;
    let (host, _host_inbox) = connect_user(&server, 1).await;
    let (guest, mut guest_inbox) = connect_user(&server, 2).await;
    assert!(send_frame(&server, &host, json!({"id": 110, "game": {"name": "Handoff"}})).await);
    let game_id = host.current_game().expect("game");
    assert!(send_frame(&server, &guest, json!({"id": 111, "game_id": game_id})).await);
    drain(&mut guest_inbox);

    assert!(server.disconnect(&host).await);

    let received = packet_ids(&mut guest_inbox);
    assert!(received.contains(&PacketId::ServerGamePlayerLeft));
    assert!(received.contains(&PacketId::ServerGameHostChanged));
    assert!(received.contains(&PacketId::ServerUserDisconnected));
    let view = server.engine().game_view(game_id).await.expect("game survives");
    assert_eq!(view.host_id, 2);
    assert_eq!(view.player_ids, vec![2]);
}

#[tokio::test]
async fn test_last_player_leaving_disbands_the_game() {
    let server = create_test_server().await;
    let (host, _host_inbox) = connect_user(&server, 1).await;
    let (browser, mut browser_inbox) = connect_user(&server, 2).await;
    assert!(send_frame(&server, &browser, json!({"id": 108})).await);
    assert!(send_frame(&server, &host, json!({"id": 110, "game": {"name": "Solo"}})).await);
    let game_id = host.current_game().expect("game");
    assert_eq!(
        packet_ids(&mut browser_inbox).last(),
        Some(&PacketId::ServerGameInfo)
    );

    assert!(send_frame(&server, &host, json!({"id": 112})).await);
    assert_eq!(
        packet_ids(&mut browser_inbox),
        vec![PacketId::ServerGameDisbanded]
    );
    assert!(server.engine().game_view(game_id).await.is_none());
    assert_eq!(server.engine().active_games(), 0);
}
