//! Multiplayer packet handlers.
//!
//! Game-scoped packets carry no game id; the target is the game the session's
//! back-reference points at, and the engine re-validates membership and
//! authority under the game lock.

use std::sync::Arc;

use super::GameServer;
use crate::multiplayer::EngineError;
use crate::protocol::messages::{
    ClientChangeAllowedModes, ClientChangeDifficultyFilter, ClientChangeFreeMod,
    ClientChangeLongNoteFilter, ClientChangeMap, ClientChangeMaxPlayers,
    ClientChangeMaxSongLength, ClientChangeMinAudioRate, ClientChangeModifiers, ClientChangeName,
    ClientChangePassword, ClientChangeRuleset, ClientChangeTeam, ClientCreateGame, ClientEmpty,
    ClientJoinGame, ClientJudgements, ClientProvidedDifficulties, ClientSetReferee,
    ClientTargetUser, ClientToggle, NotificationPayload,
};
use crate::protocol::{GameId, NotificationKind, ServerPacket};
use crate::session::UserSession;

fn report(
    action: &'static str,
    session: &UserSession,
    game_id: GameId,
    result: Result<bool, EngineError>,
) {
    let user_id = session.id();
    match result {
        Ok(true) => tracing::debug!(user_id, game_id, action, "Game change applied"),
        Ok(false) => tracing::trace!(user_id, game_id, action, "Game change had no effect"),
        Err(err) => tracing::debug!(user_id, game_id, action, error = %err, "Game change rejected"),
    }
}

fn creation_failure_message(err: &EngineError) -> String {
    match err {
        EngineError::TooManyGames { .. } => {
            "Too many matches are open right now. Please try again later.".to_string()
        }
        EngineError::Persistence(_) | EngineError::NotFound => {
            "The match could not be created. Please try again.".to_string()
        }
    }
}

impl GameServer {
    pub(super) async fn handle_create_game(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientCreateGame>,
    ) {
        let Some(packet) = packet else {
            return;
        };
        let password = packet.game.password.clone();
        match self.engine.create(packet.game, password, session.id()).await {
            Ok(view) => {
                tracing::debug!(user_id = session.id(), game_id = view.id, "Create handled");
            }
            Err(err) => {
                tracing::warn!(user_id = session.id(), error = %err, "Game creation failed");
                session.send(Arc::new(ServerPacket::Notification(NotificationPayload {
                    kind: NotificationKind::Error,
                    message: creation_failure_message(&err),
                })));
            }
        }
    }

    pub(super) async fn handle_join_game(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientJoinGame>,
    ) {
        let Some(packet) = packet else {
            return;
        };
        // The engine answers the requester with a success or failure packet.
        let _ = self
            .engine
            .add_player(packet.game_id, session.id(), packet.password.as_deref())
            .await;
    }

    pub(super) async fn handle_leave_game(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientEmpty>,
    ) {
        if packet.is_none() {
            return;
        }
        if !self.engine.leave_current_game(session.id()).await {
            tracing::debug!(user_id = session.id(), "Leave ignored: not in a game");
        }
    }

    pub(super) async fn handle_change_map(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeMap>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self.engine.change_map(game_id, session.id(), packet.map).await;
        report("change_map", session, game_id, result);
    }

    pub(super) async fn handle_change_name(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeName>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .change_name(game_id, session.id(), &packet.name)
            .await;
        report("change_name", session, game_id, result);
    }

    pub(super) async fn handle_change_password(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangePassword>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_password(game_id, session.id(), packet.password)
            .await;
        report("set_password", session, game_id, result);
    }

    pub(super) async fn handle_change_max_players(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeMaxPlayers>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_max_player_count(game_id, session.id(), packet.max_players)
            .await;
        report("set_max_player_count", session, game_id, result);
    }

    pub(super) async fn handle_change_modifiers(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeModifiers>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_global_modifiers(game_id, session.id(), packet.modifiers)
            .await;
        report("set_global_modifiers", session, game_id, result);
    }

    pub(super) async fn handle_player_change_modifiers(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeModifiers>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_player_modifiers(game_id, session.id(), packet.modifiers)
            .await;
        report("set_player_modifiers", session, game_id, result);
    }

    pub(super) async fn handle_change_free_mod(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeFreeMod>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_free_mod(game_id, session.id(), packet.free_mod_type)
            .await;
        report("set_free_mod", session, game_id, result);
    }

    pub(super) async fn handle_host_selecting_map(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientToggle>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_host_selecting_map(game_id, session.id(), packet.enabled)
            .await;
        report("set_host_selecting_map", session, game_id, result);
    }

    pub(super) async fn handle_enable_preview(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientToggle>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_enable_preview(game_id, session.id(), packet.enabled)
            .await;
        report("set_enable_preview", session, game_id, result);
    }

    pub(super) async fn handle_provided_difficulties(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientProvidedDifficulties>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_client_provided_difficulty_ratings(game_id, session.id(), packet.difficulties)
            .await;
        report("set_difficulty_ratings", session, game_id, result);
    }

    pub(super) async fn handle_player_has_map(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientEmpty>,
    ) {
        let (Some(_), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self.engine.set_player_has_map(game_id, session.id()).await;
        report("set_player_has_map", session, game_id, result);
    }

    pub(super) async fn handle_player_no_map(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientEmpty>,
    ) {
        let (Some(_), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_player_doesnt_have_map(game_id, session.id())
            .await;
        report("set_player_doesnt_have_map", session, game_id, result);
    }

    pub(super) async fn handle_player_ready(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientEmpty>,
    ) {
        let (Some(_), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self.engine.set_player_ready(game_id, session.id()).await;
        report("set_player_ready", session, game_id, result);
    }

    pub(super) async fn handle_player_not_ready(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientEmpty>,
    ) {
        let (Some(_), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self.engine.set_player_not_ready(game_id, session.id()).await;
        report("set_player_not_ready", session, game_id, result);
    }

    pub(super) async fn handle_start_countdown(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientEmpty>,
    ) {
        let (Some(_), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self.engine.start_countdown(game_id, session.id()).await;
        report("start_countdown", session, game_id, result);
    }

    pub(super) async fn handle_stop_countdown(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientEmpty>,
    ) {
        let (Some(_), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self.engine.stop_countdown(game_id, session.id()).await;
        report("stop_countdown", session, game_id, result);
    }

    pub(super) async fn handle_start_match(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientEmpty>,
    ) {
        let (Some(_), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self.engine.start_match(game_id, session.id()).await;
        report("start_match", session, game_id, result);
    }

    pub(super) async fn handle_change_host(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientTargetUser>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .change_host(game_id, session.id(), packet.user_id)
            .await;
        report("change_host", session, game_id, result);
    }

    pub(super) async fn handle_change_ruleset(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeRuleset>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .change_ruleset(game_id, session.id(), packet.ruleset)
            .await;
        report("change_ruleset", session, game_id, result);
    }

    pub(super) async fn handle_change_team(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeTeam>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .change_team(game_id, session.id(), packet.team)
            .await;
        report("change_team", session, game_id, result);
    }

    pub(super) async fn handle_kick_player(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientTargetUser>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .kick_player(game_id, session.id(), packet.user_id)
            .await;
        report("kick_player", session, game_id, result);
    }

    pub(super) async fn handle_host_rotation(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientToggle>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_host_rotation(game_id, session.id(), packet.enabled)
            .await;
        report("set_host_rotation", session, game_id, result);
    }

    pub(super) async fn handle_tournament_mode(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientToggle>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_tournament_mode(game_id, session.id(), packet.enabled)
            .await;
        report("set_tournament_mode", session, game_id, result);
    }

    pub(super) async fn handle_set_referee(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientSetReferee>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_referee(game_id, session.id(), packet.user_id)
            .await;
        report("set_referee", session, game_id, result);
    }

    pub(super) async fn handle_difficulty_filter(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeDifficultyFilter>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_difficulty_filter(game_id, session.id(), packet.min, packet.max)
            .await;
        report("set_difficulty_filter", session, game_id, result);
    }

    pub(super) async fn handle_max_song_length(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeMaxSongLength>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_max_song_length(game_id, session.id(), packet.seconds)
            .await;
        report("set_max_song_length", session, game_id, result);
    }

    pub(super) async fn handle_long_note_filter(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeLongNoteFilter>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_long_note_filter(game_id, session.id(), packet.min, packet.max)
            .await;
        report("set_long_note_filter", session, game_id, result);
    }

    pub(super) async fn handle_min_audio_rate(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeMinAudioRate>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_min_audio_rate(game_id, session.id(), packet.rate)
            .await;
        report("set_min_audio_rate", session, game_id, result);
    }

    pub(super) async fn handle_allowed_modes(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientChangeAllowedModes>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .set_allowed_game_modes(game_id, session.id(), &packet.modes)
            .await;
        report("set_allowed_game_modes", session, game_id, result);
    }

    pub(super) async fn handle_judgements(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientJudgements>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .submit_judgements(game_id, session.id(), packet.judgements)
            .await;
        if let Err(err) = result {
            tracing::debug!(user_id = session.id(), game_id, error = %err, "Judgements rejected");
        }
    }

    pub(super) async fn handle_player_finished(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientEmpty>,
    ) {
        let (Some(_), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self.engine.player_finished(game_id, session.id()).await;
        report("player_finished", session, game_id, result);
    }

    pub(super) async fn handle_invite(
        &self,
        session: &Arc<UserSession>,
        packet: Option<ClientTargetUser>,
    ) {
        let (Some(packet), Some(game_id)) = (packet, session.current_game()) else {
            return;
        };
        let result = self
            .engine
            .invite(game_id, session.id(), packet.user_id)
            .await;
        report("invite", session, game_id, result);
    }
}
