use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::GameServer;

impl GameServer {
    /// Periodically drop sessions whose heartbeat went silent. Runs until
    /// `shutdown` is cancelled.
    pub async fn cleanup_task(self: Arc<Self>, shutdown: CancellationToken) {
        let period = Duration::from_secs(self.config.server.cleanup_interval_secs.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    tracing::debug!("Cleanup task stopped");
                    return;
                }
                _ = interval.tick() => {
                    let now = chrono::Utc::now().timestamp_millis();
                    self.sweep_stale_sessions(now).await;
                }
            }
        }
    }

    /// Disconnect every session without a pong within the ping timeout.
    pub async fn sweep_stale_sessions(&self, now_millis: i64) -> usize {
        let timeout_millis =
            i64::try_from(self.config.server.ping_timeout_secs.saturating_mul(1000))
                .unwrap_or(i64::MAX);
        let stale = self.sessions.take_stale(now_millis, timeout_millis).await;
        let count = stale.len();

        for session in stale {
            tracing::info!(
                user_id = session.id(),
                connection_id = %session.connection_id(),
                "Removing session with expired heartbeat"
            );
            session.close();
            self.release_session(&session).await;
        }

        self.metrics.add_stale_sessions_cleaned(count as u64);
        count
    }
}
