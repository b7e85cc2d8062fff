use std::sync::Arc;
use std::time::Duration;

use super::engine::{require_authority, EngineError, MultiplayerEngine, Outcome};
use crate::protocol::messages::{GameCountdownPayload, GameIdPayload};
use crate::protocol::{GameId, ServerPacket, UserId};

impl MultiplayerEngine {
    /// Arm the start countdown. A second start while one is pending, or while
    /// the match runs, changes nothing.
    pub async fn start_countdown(
        self: &Arc<Self>,
        game_id: GameId,
        caller: UserId,
    ) -> Result<bool, EngineError> {
        let duration_ms = self.config.countdown_ms;
        let now = chrono::Utc::now().timestamp_millis();

        let armed = self
            .run_locked(game_id, |game| -> Result<Option<(u64, Outcome)>, EngineError> {
                require_authority(game, caller)?;
                let Some(generation) = game.arm_countdown(now) else {
                    return Ok(None);
                };
                let packet = ServerPacket::GameCountdownStarted(GameCountdownPayload {
                    game_id,
                    started_at: now,
                    duration_ms,
                });
                Ok(Some((generation, Outcome::capture(game, vec![packet]))))
            })
            .await
            .ok_or(EngineError::NotFound)??;

        let Some((generation, outcome)) = armed else {
            tracing::debug!(game_id, caller, "Countdown already pending or match running");
            return Ok(false);
        };
        self.publish(outcome).await;
        tracing::info!(game_id, caller, duration_ms, "Countdown started");

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
            engine.fire_countdown(game_id, generation).await;
        });
        Ok(true)
    }

    /// Withdraw a pending countdown. Its scheduled start becomes a no-op.
    pub async fn stop_countdown(&self, game_id: GameId, caller: UserId) -> Result<bool, EngineError> {
        let stopped = self
            .mutate(game_id, |game| {
                require_authority(game, caller)?;
                if game.in_progress || !game.disarm_countdown() {
                    return Ok(Vec::new());
                }
                Ok(vec![ServerPacket::GameCountdownStopped(GameIdPayload {
                    game_id,
                })])
            })
            .await?;
        if stopped {
            tracing::info!(game_id, caller, "Countdown stopped");
        }
        Ok(stopped)
    }

    /// Start immediately, cancelling any pending countdown.
    pub async fn start_match(&self, game_id: GameId, caller: UserId) -> Result<bool, EngineError> {
        let started = self
            .mutate(game_id, |game| {
                require_authority(game, caller)?;
                if !game.begin_match() {
                    return Ok(Vec::new());
                }
                Ok(vec![ServerPacket::GameStarted(GameIdPayload { game_id })])
            })
            .await?;
        if started {
            self.metrics.increment_matches_started();
            tracing::info!(game_id, caller, "Match started by host");
        }
        Ok(started)
    }

    /// Scheduled end of a countdown. Only the generation that armed the
    /// countdown may start the match.
    pub(super) async fn fire_countdown(&self, game_id: GameId, generation: u64) -> bool {
        let outcome = self
            .run_locked(game_id, |game| {
                if !game.countdown_is_current(generation) {
                    return None;
                }
                if game.begin_match() {
                    let packet = ServerPacket::GameStarted(GameIdPayload { game_id });
                    return Some((true, Outcome::capture(game, vec![packet])));
                }
                game.disarm_countdown();
                let packet = ServerPacket::GameCountdownStopped(GameIdPayload { game_id });
                Some((false, Outcome::capture(game, vec![packet])))
            })
            .await
            .flatten();

        match outcome {
            Some((started, outcome)) => {
                self.publish(outcome).await;
                if started {
                    self.metrics.increment_matches_started();
                    tracing::info!(game_id, "Countdown elapsed, match started");
                } else {
                    tracing::info!(game_id, "Countdown elapsed with nobody able to play");
                }
                started
            }
            None => {
                tracing::debug!(game_id, generation, "Stale countdown ignored");
                false
            }
        }
    }
}
