//! Authoritative registry and lifecycle of multiplayer matches.
//!
//! Each match sits behind its own async mutex. Every mutation runs inside
//! [`MultiplayerEngine::run_locked`], which returns the packets and side
//! effects to apply; those are applied only after the guard is dropped, so no
//! broadcast, cache write or persistence call ever happens under a game lock.

use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::game::{Game, MatchState};
use crate::cache::{GameStateMirror, MirrorFields};
use crate::config::MultiplayerConfig;
use crate::database::{GameRecord, MatchScoreRecord, Persistence};
use crate::lobby::LobbyRegistry;
use crate::messaging::MessagingService;
use crate::metrics::ServerMetrics;
use crate::protocol::messages::{
    GameIdPayload, GamePayload, GamePlayerPayload, GameSettingsPayload, JoinFailedPayload,
};
use crate::protocol::{GameId, GameView, JoinGameError, ServerPacket, UserId};
use crate::session::SessionRegistry;

/// Engine operation failures.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The game does not exist, or the caller is not allowed to act on it.
    #[error("game not found")]
    NotFound,
    #[error("active game limit of {limit} reached")]
    TooManyGames { limit: usize },
    #[error("failed to persist game: {0:#}")]
    Persistence(anyhow::Error),
}

/// Result of a successful join request.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    Joined(GameView),
    AlreadyMember(GameView),
}

impl JoinOutcome {
    pub fn view(&self) -> &GameView {
        match self {
            Self::Joined(view) | Self::AlreadyMember(view) => view,
        }
    }
}

pub struct GameHandle {
    game: Mutex<Game>,
}

impl GameHandle {
    fn new(game: Game) -> Self {
        Self {
            game: Mutex::new(game),
        }
    }
}

/// Snapshot taken under the lock for the cache and the lobby.
pub(super) struct Snapshot {
    game_id: GameId,
    public_id: String,
    fields: MirrorFields,
    view: GameView,
}

/// Everything a critical section wants done once the lock is released.
pub(super) struct Outcome {
    pub(super) recipients: Vec<UserId>,
    pub(super) packets: Vec<ServerPacket>,
    pub(super) snapshot: Option<Snapshot>,
    pub(super) scores: Vec<MatchScoreRecord>,
    /// A match ended inside the critical section.
    pub(super) concluded: bool,
}

impl Outcome {
    /// Packets for the whole roster plus a cache and lobby refresh.
    pub(super) fn capture(game: &Game, packets: Vec<ServerPacket>) -> Self {
        Self {
            recipients: game.roster.clone(),
            packets,
            snapshot: Some(Snapshot {
                game_id: game.id,
                public_id: game.public_id.clone(),
                fields: game.mirror_fields(),
                view: game.view(),
            }),
            scores: Vec::new(),
            concluded: false,
        }
    }

    /// Packets for the roster only; nothing the lobby or the cache tracks
    /// changed.
    pub(super) fn quiet(game: &Game, packets: Vec<ServerPacket>) -> Self {
        Self {
            recipients: game.roster.clone(),
            packets,
            snapshot: None,
            scores: Vec::new(),
            concluded: false,
        }
    }

    /// Mark the outcome as ending a match with these results.
    pub(super) fn with_scores(mut self, scores: Vec<MatchScoreRecord>) -> Self {
        self.scores = scores;
        self.concluded = true;
        self
    }

    pub(super) fn except(mut self, user_id: UserId) -> Self {
        self.recipients.retain(|id| *id != user_id);
        self
    }
}

pub(super) fn require_authority(game: &Game, caller: UserId) -> Result<(), EngineError> {
    if game.has_host_authority(caller) {
        Ok(())
    } else {
        Err(EngineError::NotFound)
    }
}

pub(super) fn require_member(game: &Game, caller: UserId) -> Result<(), EngineError> {
    if game.is_member(caller) {
        Ok(())
    } else {
        Err(EngineError::NotFound)
    }
}

pub(super) enum Departure {
    Left(Outcome),
    Disbanded { public_id: String },
}

pub struct MultiplayerEngine {
    pub(super) games: DashMap<GameId, Arc<GameHandle>>,
    public_ids: DashMap<String, GameId>,
    pub(super) sessions: Arc<SessionRegistry>,
    lobby: Arc<LobbyRegistry>,
    persistence: Arc<dyn Persistence>,
    mirror: Arc<dyn GameStateMirror>,
    messaging: Arc<dyn MessagingService>,
    pub(super) metrics: Arc<ServerMetrics>,
    pub(super) config: MultiplayerConfig,
    /// Serialises the limit check with the insert of a new game.
    creation: Mutex<()>,
}

impl MultiplayerEngine {
    pub fn new(
        config: MultiplayerConfig,
        sessions: Arc<SessionRegistry>,
        lobby: Arc<LobbyRegistry>,
        persistence: Arc<dyn Persistence>,
        mirror: Arc<dyn GameStateMirror>,
        messaging: Arc<dyn MessagingService>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            games: DashMap::new(),
            public_ids: DashMap::new(),
            sessions,
            lobby,
            persistence,
            mirror,
            messaging,
            metrics,
            config,
            creation: Mutex::new(()),
        }
    }

    fn handle(&self, game_id: GameId) -> Option<Arc<GameHandle>> {
        self.games.get(&game_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Run `f` with exclusive access to one live game. `None` when the game
    /// does not exist or was disbanded while waiting for the lock.
    pub async fn run_locked<R>(
        &self,
        game_id: GameId,
        f: impl FnOnce(&mut Game) -> R,
    ) -> Option<R> {
        let handle = self.handle(game_id)?;
        let mut game = handle.game.lock().await;
        if game.disbanded {
            return None;
        }
        Some(f(&mut game))
    }

    /// Apply a change under the lock and publish its packets afterwards.
    /// `Ok(false)` means the change was valid but altered nothing.
    pub(super) async fn mutate<F>(&self, game_id: GameId, change: F) -> Result<bool, EngineError>
    where
        F: FnOnce(&mut Game) -> Result<Vec<ServerPacket>, EngineError>,
    {
        let outcome = self
            .run_locked(game_id, |game| -> Result<Option<Outcome>, EngineError> {
                let packets = change(game)?;
                if packets.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Outcome::capture(game, packets)))
            })
            .await
            .ok_or(EngineError::NotFound)??;

        match outcome {
            Some(outcome) => {
                self.publish(outcome).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(super) async fn publish(&self, outcome: Outcome) {
        let Outcome {
            recipients,
            packets,
            snapshot,
            scores,
            concluded,
        } = outcome;

        if concluded {
            self.metrics.increment_matches_finished();
        }

        for packet in packets {
            self.sessions.send_to(packet, &recipients).await;
        }

        for record in &scores {
            if let Err(err) = self.persistence.insert_match_score(record).await {
                self.metrics.increment_persistence_failures();
                tracing::warn!(
                    game_id = record.game_id,
                    user_id = record.user_id,
                    error = %err,
                    "Failed to persist match score"
                );
            }
        }

        if let Some(snapshot) = snapshot {
            if !self.games.contains_key(&snapshot.game_id) {
                tracing::debug!(public_id = %snapshot.public_id, "Skipping mirror of disbanded game");
                return;
            }
            self.mirror_game(&snapshot.public_id, snapshot.fields).await;
            self.notify_lobby(ServerPacket::GameInfo(GamePayload {
                game: snapshot.view,
            }))
            .await;
        }
    }

    async fn mirror_game(&self, public_id: &str, fields: MirrorFields) {
        if let Err(err) = self.mirror.mirror(public_id, fields).await {
            self.metrics.increment_mirror_failures();
            tracing::warn!(public_id, error = %err, "Failed to mirror game state");
        }
    }

    async fn notify_lobby(&self, packet: ServerPacket) {
        let members = self.lobby.members().await;
        if !members.is_empty() {
            self.sessions.send_to(packet, &members).await;
        }
    }

    /// Create a match, persist its shell and add the creator as host.
    pub async fn create(
        &self,
        settings: GameSettingsPayload,
        password: Option<String>,
        creator_id: UserId,
    ) -> Result<GameView, EngineError> {
        let limit = self.config.max_concurrent_games;
        let slot = self.creation.lock().await;
        if self.games.len() >= limit {
            self.metrics.increment_game_creation_failures();
            tracing::warn!(creator_id, limit, "Refusing game creation: limit reached");
            return Err(EngineError::TooManyGames { limit });
        }

        let previous = self.current_game_of(creator_id).await;

        let public_id = Uuid::new_v4().to_string();
        let mut game = Game::new(settings, password, public_id.clone(), creator_id);
        let record = GameRecord {
            public_id: public_id.clone(),
            name: game.name.clone(),
            has_password: game.has_password(),
            max_players: game.max_players,
            ruleset: game.ruleset,
            map_md5: game.map.md5.clone(),
            created_by: creator_id,
            created_at: chrono::Utc::now(),
        };

        let game_id = match self.persistence.insert_game(&record).await {
            Ok(id) => id,
            Err(err) => {
                self.metrics.increment_game_creation_failures();
                tracing::error!(creator_id, error = %err, "Failed to persist new game");
                return Err(EngineError::Persistence(err));
            }
        };

        game.id = game_id;
        game.add_member(creator_id);
        let view = game.view();
        let fields = game.mirror_fields();
        self.games.insert(game_id, Arc::new(GameHandle::new(game)));
        self.public_ids.insert(public_id.clone(), game_id);
        drop(slot);
        self.metrics.increment_games_created();

        if let Some(previous) = previous {
            self.remove_player(previous, creator_id).await;
        }
        self.attach_member(game_id, creator_id).await;
        self.mirror_game(&public_id, fields).await;
        self.notify_lobby(ServerPacket::GameInfo(GamePayload { game: view.clone() }))
            .await;
        self.sessions
            .send_to(
                ServerPacket::GameJoinSuccess(GamePayload { game: view.clone() }),
                &[creator_id],
            )
            .await;

        tracing::info!(game_id, %public_id, creator_id, name = %view.name, "Game created");
        Ok(view)
    }

    /// Admit a user. The capacity check and the roster insert share one
    /// critical section, so concurrent joins can never overfill a match.
    pub async fn add_player(
        &self,
        game_id: GameId,
        user_id: UserId,
        password: Option<&str>,
    ) -> Result<JoinOutcome, JoinGameError> {
        let result = self.admit(game_id, user_id, password).await;
        match &result {
            Ok(JoinOutcome::Joined(view)) => {
                self.metrics.increment_players_joined();
                self.sessions
                    .send_to(
                        ServerPacket::GameJoinSuccess(GamePayload { game: view.clone() }),
                        &[user_id],
                    )
                    .await;
                tracing::info!(game_id, user_id, "Player joined game");
            }
            Ok(JoinOutcome::AlreadyMember(_)) => {
                tracing::debug!(game_id, user_id, "Join ignored: already a member");
            }
            Err(reason) => {
                self.metrics.increment_join_failures();
                self.sessions
                    .send_to(
                        ServerPacket::GameJoinFailed(JoinFailedPayload {
                            game_id,
                            reason: *reason,
                        }),
                        &[user_id],
                    )
                    .await;
                tracing::debug!(game_id, user_id, %reason, "Join rejected");
            }
        }
        result
    }

    async fn admit(
        &self,
        game_id: GameId,
        user_id: UserId,
        password: Option<&str>,
    ) -> Result<JoinOutcome, JoinGameError> {
        let Some(handle) = self.handle(game_id) else {
            return Err(JoinGameError::MatchNoExists);
        };

        let admitted = {
            let mut game = handle.game.lock().await;
            if game.disbanded {
                return Err(JoinGameError::MatchNoExists);
            }
            if game.is_member(user_id) {
                return Ok(JoinOutcome::AlreadyMember(game.view()));
            }
            if !game.password_matches(password) {
                return Err(JoinGameError::Password);
            }
            if game.is_full() {
                return Err(JoinGameError::Full);
            }
            game.add_member(user_id);
            let joined = ServerPacket::GamePlayerJoined(GamePlayerPayload { game_id, user_id });
            (game.view(), Outcome::capture(&game, vec![joined]).except(user_id))
        };

        let (view, outcome) = admitted;
        // The old seat is only given up once the new one is taken.
        if let Some(previous) = self.current_game_of(user_id).await {
            if previous != game_id {
                self.remove_player(previous, user_id).await;
            }
        }
        self.attach_member(game_id, user_id).await;
        self.publish(outcome).await;
        Ok(JoinOutcome::Joined(view))
    }

    /// Remove a member. Disbands the match when nobody is left.
    pub async fn remove_player(&self, game_id: GameId, user_id: UserId) -> bool {
        let Some(handle) = self.handle(game_id) else {
            return false;
        };

        let departure = {
            let mut game = handle.game.lock().await;
            if game.disbanded || !game.is_member(user_id) {
                return false;
            }
            depart(&mut game, user_id)
        };

        self.finish_departure(game_id, user_id, departure).await;
        true
    }

    /// Publish or disband after a member was taken off the roster.
    pub(super) async fn finish_departure(
        &self,
        game_id: GameId,
        user_id: UserId,
        departure: Departure,
    ) {
        self.detach_member(game_id, user_id).await;
        self.metrics.increment_players_left();
        tracing::info!(game_id, user_id, "Player left game");

        match departure {
            Departure::Left(outcome) => self.publish(outcome).await,
            Departure::Disbanded { public_id } => self.disband(game_id, &public_id).await,
        }
    }

    async fn current_game_of(&self, user_id: UserId) -> Option<GameId> {
        self.sessions
            .by_id(user_id)
            .await
            .and_then(|session| session.current_game())
    }

    /// Leave whatever game the user's back-reference points at.
    pub async fn leave_current_game(&self, user_id: UserId) -> bool {
        let Some(session) = self.sessions.by_id(user_id).await else {
            return false;
        };
        match session.current_game() {
            Some(game_id) => self.remove_player(game_id, user_id).await,
            None => false,
        }
    }

    /// Remove a user from every roster they appear in, regardless of the
    /// back-reference. Used when a connection goes away.
    pub async fn remove_user_everywhere(&self, user_id: UserId) -> usize {
        let handles: Vec<(GameId, Arc<GameHandle>)> = self
            .games
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut removed = 0;
        for (game_id, handle) in handles {
            let member = handle.game.lock().await.is_member(user_id);
            if member && self.remove_player(game_id, user_id).await {
                removed += 1;
            }
        }
        removed
    }

    async fn disband(&self, game_id: GameId, public_id: &str) {
        self.games.remove(&game_id);
        self.public_ids.remove(public_id);
        self.metrics.increment_games_disbanded();

        self.notify_lobby(ServerPacket::GameDisbanded(GameIdPayload { game_id }))
            .await;
        if let Err(err) = self.mirror.remove(public_id).await {
            self.metrics.increment_mirror_failures();
            tracing::warn!(game_id, public_id, error = %err, "Failed to remove mirrored game");
        }
        if let Err(err) = self.messaging.remove_game_channel(game_id).await {
            tracing::warn!(game_id, error = %err, "Failed to remove game chat channel");
        }
        tracing::info!(game_id, public_id, "Game disbanded");
    }

    async fn attach_member(&self, game_id: GameId, user_id: UserId) {
        if let Some(session) = self.sessions.by_id(user_id).await {
            session.set_current_game(Some(game_id));
        }
        if let Err(err) = self.messaging.join_game_channel(game_id, user_id).await {
            tracing::warn!(game_id, user_id, error = %err, "Failed to join game chat channel");
        }
    }

    async fn detach_member(&self, game_id: GameId, user_id: UserId) {
        if let Some(session) = self.sessions.by_id(user_id).await {
            session.clear_current_game_if(game_id);
        }
        if let Err(err) = self.messaging.leave_game_channel(game_id, user_id).await {
            tracing::warn!(game_id, user_id, error = %err, "Failed to leave game chat channel");
        }
    }

    pub fn active_games(&self) -> usize {
        self.games.len()
    }

    pub fn game_id_for_public(&self, public_id: &str) -> Option<GameId> {
        self.public_ids.get(public_id).map(|entry| *entry.value())
    }

    pub async fn game_view(&self, game_id: GameId) -> Option<GameView> {
        self.run_locked(game_id, |game| game.view()).await
    }

    pub async fn game_state(&self, game_id: GameId) -> Option<MatchState> {
        self.run_locked(game_id, |game| game.state()).await
    }

    pub async fn is_member(&self, game_id: GameId, user_id: UserId) -> bool {
        self.run_locked(game_id, |game| game.is_member(user_id))
            .await
            .unwrap_or(false)
    }

    /// Views of every live game, ordered by id.
    pub async fn game_views(&self) -> Vec<GameView> {
        let mut ids: Vec<GameId> = self.games.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        let mut views = Vec::with_capacity(ids.len());
        for game_id in ids {
            if let Some(view) = self.game_view(game_id).await {
                views.push(view);
            }
        }
        views
    }
}

/// Take `user_id` off the roster. The caller holds the lock and has checked
/// membership.
pub(super) fn depart(game: &mut Game, user_id: UserId) -> Departure {
    let game_id = game.id;
    let new_host = game.remove_member(user_id);
    if game.roster.is_empty() {
        game.disbanded = true;
        return Departure::Disbanded {
            public_id: game.public_id.clone(),
        };
    }

    let mut packets = vec![ServerPacket::GamePlayerLeft(GamePlayerPayload {
        game_id,
        user_id,
    })];
    if let Some(host_id) = new_host {
        packets.push(ServerPacket::GameHostChanged(GamePlayerPayload {
            game_id,
            user_id: host_id,
        }));
    }
    if game.all_playing_finished() {
        let conclusion = super::play::conclude_match(game);
        packets.extend(conclusion.packets);
        return Departure::Left(Outcome::capture(game, packets).with_scores(conclusion.records));
    }
    Departure::Left(Outcome::capture(game, packets))
}
