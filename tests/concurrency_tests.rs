mod test_helpers;

use cadence_server::protocol::messages::JoinFailedPayload;
use cadence_server::protocol::{JoinGameError, ServerPacket};
use serde_json::json;
use std::sync::Arc;
use test_helpers::{
    connect_user, create_test_server, create_test_server_with_config, drain, send_frame,
    test_config,
};
use tokio::sync::Barrier;

/// Concurrent joins never push a game past its player limit, and every
/// losing attempt is told the game is full.
#[tokio::test]
async fn test_concurrent_joins_respect_capacity() {
    let server = create_test_server().await;
    let (host, _host_inbox) = connect_user(&server, 1).await;
    let create = json!({"id": 110, "game": {"name": "Crowded", "max_players": 3}});
    assert!(send_frame(&server, &host, create).await);
    let game_id = host.current_game().expect("host should be in the game");

    let attempts = 5usize;
    let barrier = Arc::new(Barrier::new(attempts));
    let mut handles = Vec::new();

    for i in 0..attempts {
        let server_clone = server.clone();
        let barrier_clone = barrier.clone();
        handles.push(tokio::spawn(async move {
            let (session, mut inbox) = connect_user(&server_clone, 10 + i as i32).await;
            barrier_clone.wait().await;

            send_frame(&server_clone, &session, json!({"id": 111, "game_id": game_id})).await;
            let joined = session.current_game() == Some(game_id);
            (joined, drain(&mut inbox))
        }));
    }

    let mut successful_joins = 0;
    let mut full_rejections = 0;
    for handle in handles {
        let (joined, received) = handle.await.unwrap();
        successful_joins += usize::from(joined);
        full_rejections += received
            .iter()
            .filter(|packet| {
                matches!(
                    packet.as_ref(),
                    ServerPacket::GameJoinFailed(JoinFailedPayload {
                        reason: JoinGameError::Full,
                        ..
                    })
                )
            })
            .count();
    }

    assert_eq!(
        successful_joins, 2,
        "Only two seats were left next to the host"
    );
    assert_eq!(full_rejections, 3, "every losing join is rejected as full");

    let view = server.engine().game_view(game_id).await.expect("game still exists");
    assert_eq!(view.player_ids.len(), 3);
    let mut unique = view.player_ids.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), 3, "no player holds two seats");
    assert_eq!(view.host_id, 1);
}

/// The concurrent game limit holds when many users create at once.
#[tokio::test]
async fn test_concurrent_creation_respects_limit() {
    let mut config = test_config();
    config.multiplayer.max_concurrent_games = 3;
    let server = create_test_server_with_config(config).await;

    let attempts = 8usize;
    let barrier = Arc::new(Barrier::new(attempts));
    let mut handles = Vec::new();

    for i in 0..attempts {
        let server_clone = server.clone();
        let barrier_clone = barrier.clone();
        handles.push(tokio::spawn(async move {
            let (session, _inbox) = connect_user(&server_clone, 100 + i as i32).await;
            barrier_clone.wait().await;

            let frame = json!({"id": 110, "game": {"name": format!("Game {i}")}});
            send_frame(&server_clone, &session, frame).await;
            usize::from(session.current_game().is_some())
        }));
    }

    let mut created = 0;
    for handle in handles {
        created += handle.await.unwrap();
    }

    assert_eq!(created, 3, "the limit of 3 games must hold");
    assert_eq!(server.engine().active_games(), 3);
    assert_eq!(
        server
            .metrics()
            .game_creation_failures
            .load(std::sync::atomic::Ordering::Relaxed),
        5
    );
}

/// Players leaving while others join leave a consistent roster behind.
#[tokio::test]
async fn test_concurrent_join_and_leave() {
    let server = create_test_server().await;
    let (host, _host_inbox) = connect_user(&server, 1).await;
    assert!(send_frame(&server, &host, json!({"id": 110, "game": {"name": "Busy"}})).await);
    let game_id = host.current_game().expect("game");

    let attempts = 6usize;
    let barrier = Arc::new(Barrier::new(attempts));
    let mut handles = Vec::new();

    for i in 0..attempts {
        let server_clone = server.clone();
        let barrier_clone = barrier.clone();
        handles.push(tokio::spawn(async move {
            let (session, _inbox) = connect_user(&server_clone, 20 + i as i32).await;
            send_frame(&server_clone, &session, json!({"id": 111, "game_id": game_id})).await;
            barrier_clone.wait().await;

            if i % 2 == 0 {
                send_frame(&server_clone, &session, json!({"id": 112})).await;
                None
            } else {
                Some(session.id())
            }
        }));
    }

    let mut stayed = Vec::new();
    for handle in handles {
        if let Some(user_id) = handle.await.unwrap() {
            stayed.push(user_id);
        }
    }

    let view = server.engine().game_view(game_id).await.expect("game");
    let mut roster = view.player_ids.clone();
    roster.sort_unstable();
    let mut expected = stayed;
    expected.push(1);
    expected.sort_unstable();
    assert_eq!(roster, expected);
}
