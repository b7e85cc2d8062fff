use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the in-memory game server
#[derive(Debug)]
pub struct ServerMetrics {
    // Connection metrics
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,
    pub disconnections: AtomicU64,
    pub login_failures: AtomicU64,
    pub duplicate_logins: AtomicU64,

    // Game metrics
    pub games_created: AtomicU64,
    pub game_creation_failures: AtomicU64,
    pub games_disbanded: AtomicU64,
    pub players_joined: AtomicU64,
    pub join_failures: AtomicU64,
    pub players_left: AtomicU64,
    pub matches_started: AtomicU64,
    pub matches_finished: AtomicU64,

    // Packet metrics
    pub packets_handled: AtomicU64,
    pub packets_dropped: AtomicU64,
    pub unauthenticated_packets: AtomicU64,

    // Delivery and dependency failures
    pub send_failures: AtomicU64,
    pub mirror_failures: AtomicU64,
    pub persistence_failures: AtomicU64,

    // Cleanup
    pub stale_sessions_cleaned: AtomicU64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub connections: ConnectionMetrics,
    pub games: GameMetrics,
    pub packets: PacketMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConnectionMetrics {
    pub total_connections: u64,
    pub active_connections: u64,
    pub disconnections: u64,
    pub login_failures: u64,
    pub duplicate_logins: u64,
    pub stale_sessions_cleaned: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GameMetrics {
    pub games_created: u64,
    pub game_creation_failures: u64,
    pub games_disbanded: u64,
    pub active_games: u64,
    pub players_joined: u64,
    pub join_failures: u64,
    pub players_left: u64,
    pub matches_started: u64,
    pub matches_finished: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PacketMetrics {
    pub packets_handled: u64,
    pub packets_dropped: u64,
    pub unauthenticated_packets: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorMetrics {
    pub send_failures: u64,
    pub mirror_failures: u64,
    pub persistence_failures: u64,
    pub total_errors: u64,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            disconnections: AtomicU64::new(0),
            login_failures: AtomicU64::new(0),
            duplicate_logins: AtomicU64::new(0),
            games_created: AtomicU64::new(0),
            game_creation_failures: AtomicU64::new(0),
            games_disbanded: AtomicU64::new(0),
            players_joined: AtomicU64::new(0),
            join_failures: AtomicU64::new(0),
            players_left: AtomicU64::new(0),
            matches_started: AtomicU64::new(0),
            matches_finished: AtomicU64::new(0),
            packets_handled: AtomicU64::new(0),
            packets_dropped: AtomicU64::new(0),
            unauthenticated_packets: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            mirror_failures: AtomicU64::new(0),
            persistence_failures: AtomicU64::new(0),
            stale_sessions_cleaned: AtomicU64::new(0),
        }
    }

    // Connection metrics
    pub fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        // Use fetch_update for atomic check-then-decrement to prevent underflow
        let _ =
            self.active_connections
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                    if current > 0 {
                        Some(current - 1)
                    } else {
                        None
                    }
                });
        self.disconnections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_login_failures(&self) {
        self.login_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_duplicate_logins(&self) {
        self.duplicate_logins.fetch_add(1, Ordering::Relaxed);
    }

    // Game metrics
    pub fn increment_games_created(&self) {
        self.games_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_game_creation_failures(&self) {
        self.game_creation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_games_disbanded(&self) {
        self.games_disbanded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_players_joined(&self) {
        self.players_joined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_join_failures(&self) {
        self.join_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_players_left(&self) {
        self.players_left.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matches_started(&self) {
        self.matches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_matches_finished(&self) {
        self.matches_finished.fetch_add(1, Ordering::Relaxed);
    }

    // Packet metrics
    pub fn increment_packets_handled(&self) {
        self.packets_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_packets_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unauthenticated_packets(&self) {
        self.unauthenticated_packets.fetch_add(1, Ordering::Relaxed);
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    // Failures
    pub fn increment_send_failures(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_mirror_failures(&self) {
        self.mirror_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_persistence_failures(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_stale_sessions_cleaned(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.stale_sessions_cleaned
            .fetch_add(count, Ordering::Relaxed);
    }

    // Snapshot generation
    pub fn snapshot(&self) -> MetricsSnapshot {
        let games_created = self.games_created.load(Ordering::Relaxed);
        let games_disbanded = self.games_disbanded.load(Ordering::Relaxed);

        let send_failures = self.send_failures.load(Ordering::Relaxed);
        let mirror_failures = self.mirror_failures.load(Ordering::Relaxed);
        let persistence_failures = self.persistence_failures.load(Ordering::Relaxed);

        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            connections: ConnectionMetrics {
                total_connections: self.total_connections.load(Ordering::Relaxed),
                active_connections: self.active_connections.load(Ordering::Relaxed),
                disconnections: self.disconnections.load(Ordering::Relaxed),
                login_failures: self.login_failures.load(Ordering::Relaxed),
                duplicate_logins: self.duplicate_logins.load(Ordering::Relaxed),
                stale_sessions_cleaned: self.stale_sessions_cleaned.load(Ordering::Relaxed),
            },
            games: GameMetrics {
                games_created,
                game_creation_failures: self.game_creation_failures.load(Ordering::Relaxed),
                games_disbanded,
                active_games: games_created.saturating_sub(games_disbanded),
                players_joined: self.players_joined.load(Ordering::Relaxed),
                join_failures: self.join_failures.load(Ordering::Relaxed),
                players_left: self.players_left.load(Ordering::Relaxed),
                matches_started: self.matches_started.load(Ordering::Relaxed),
                matches_finished: self.matches_finished.load(Ordering::Relaxed),
            },
            packets: PacketMetrics {
                packets_handled: self.packets_handled.load(Ordering::Relaxed),
                packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
                unauthenticated_packets: self.unauthenticated_packets.load(Ordering::Relaxed),
            },
            errors: ErrorMetrics {
                send_failures,
                mirror_failures,
                persistence_failures,
                total_errors: send_failures + mirror_failures + persistence_failures,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_decrement_active_connections_no_underflow() {
        let metrics = ServerMetrics::new();
        metrics.decrement_active_connections();
        assert_eq!(metrics.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.disconnections.load(Ordering::Relaxed), 1);

        metrics.increment_connections();
        metrics.decrement_active_connections();
        metrics.decrement_active_connections();
        assert_eq!(metrics.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.total_connections.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_concurrent_increment_decrement_active_connections() {
        let metrics = Arc::new(ServerMetrics::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let metrics = metrics.clone();
            handles.push(tokio::spawn(async move {
                metrics.increment_connections();
                metrics.decrement_active_connections();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(metrics.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.total_connections.load(Ordering::Relaxed), 50);
    }

    #[test]
    fn test_snapshot_derives_active_games_and_totals() {
        let metrics = ServerMetrics::new();
        metrics.increment_games_created();
        metrics.increment_games_created();
        metrics.increment_games_disbanded();
        metrics.increment_send_failures();
        metrics.increment_mirror_failures();
        metrics.increment_unauthenticated_packets();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.games.active_games, 1);
        assert_eq!(snapshot.errors.total_errors, 2);
        assert_eq!(snapshot.packets.packets_dropped, 1);
        assert_eq!(snapshot.packets.unauthenticated_packets, 1);
    }
}
