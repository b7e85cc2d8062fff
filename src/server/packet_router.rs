//! Static routing table from client packet ids to their handlers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::GameServer;
use crate::protocol::messages::{
    ClientChangeAllowedModes, ClientChangeDifficultyFilter, ClientChangeFreeMod,
    ClientChangeLongNoteFilter, ClientChangeMap, ClientChangeMaxPlayers,
    ClientChangeMaxSongLength, ClientChangeMinAudioRate, ClientChangeModifiers, ClientChangeName,
    ClientChangePassword, ClientChangeRuleset, ClientChangeTeam, ClientCreateGame, ClientEmpty,
    ClientJoinGame, ClientJudgements, ClientPong, ClientProvidedDifficulties, ClientSetReferee,
    ClientStatusUpdate, ClientTargetUser, ClientToggle, ClientUserListRequest,
};
use crate::protocol::{decode_envelope, decode_packet, ConnectionId, PacketId};
use crate::session::UserSession;

pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Decodes the concrete body of a frame and runs the matching server method.
pub type Handler = for<'a> fn(&'a GameServer, &'a Arc<UserSession>, &'a str) -> HandlerFuture<'a>;

macro_rules! route {
    ($packet:ty => $method:ident) => {{
        fn handler<'a>(
            server: &'a GameServer,
            session: &'a Arc<UserSession>,
            frame: &'a str,
        ) -> HandlerFuture<'a> {
            let packet: Option<$packet> = decode_packet(frame);
            Box::pin(server.$method(session, packet))
        }
        handler as Handler
    }};
}

/// `None` for server-direction ids and for client packets this server does
/// not implement.
pub fn handler_for(id: PacketId) -> Option<Handler> {
    let handler = match id {
        PacketId::ClientPong => route!(ClientPong => handle_pong),
        PacketId::ClientStatusUpdate => route!(ClientStatusUpdate => handle_status_update),
        PacketId::ClientRequestUserInfo => {
            route!(ClientUserListRequest => handle_user_info_request)
        }
        PacketId::ClientRequestUserStatus => {
            route!(ClientUserListRequest => handle_user_status_request)
        }
        PacketId::ClientRequestUsersOnline => route!(ClientEmpty => handle_users_online),
        PacketId::ClientLobbyJoin => route!(ClientEmpty => handle_lobby_join),
        PacketId::ClientLobbyLeave => route!(ClientEmpty => handle_lobby_leave),
        PacketId::ClientCreateGame => route!(ClientCreateGame => handle_create_game),
        PacketId::ClientJoinGame => route!(ClientJoinGame => handle_join_game),
        PacketId::ClientLeaveGame => route!(ClientEmpty => handle_leave_game),
        PacketId::ClientGameChangeMap => route!(ClientChangeMap => handle_change_map),
        PacketId::ClientGameChangeName => route!(ClientChangeName => handle_change_name),
        PacketId::ClientGameChangePassword => {
            route!(ClientChangePassword => handle_change_password)
        }
        PacketId::ClientGameChangeMaxPlayers => {
            route!(ClientChangeMaxPlayers => handle_change_max_players)
        }
        PacketId::ClientGameChangeModifiers => {
            route!(ClientChangeModifiers => handle_change_modifiers)
        }
        PacketId::ClientGamePlayerChangeModifiers => {
            route!(ClientChangeModifiers => handle_player_change_modifiers)
        }
        PacketId::ClientGameChangeFreeMod => route!(ClientChangeFreeMod => handle_change_free_mod),
        PacketId::ClientGameHostSelectingMap => route!(ClientToggle => handle_host_selecting_map),
        PacketId::ClientGameEnablePreview => route!(ClientToggle => handle_enable_preview),
        PacketId::ClientGameClientProvidedDifficulties => {
            route!(ClientProvidedDifficulties => handle_provided_difficulties)
        }
        PacketId::ClientGamePlayerHasMap => route!(ClientEmpty => handle_player_has_map),
        PacketId::ClientGamePlayerNoMap => route!(ClientEmpty => handle_player_no_map),
        PacketId::ClientGamePlayerReady => route!(ClientEmpty => handle_player_ready),
        PacketId::ClientGamePlayerNotReady => route!(ClientEmpty => handle_player_not_ready),
        PacketId::ClientGameStartCountdown => route!(ClientEmpty => handle_start_countdown),
        PacketId::ClientGameStopCountdown => route!(ClientEmpty => handle_stop_countdown),
        PacketId::ClientGameStart => route!(ClientEmpty => handle_start_match),
        PacketId::ClientGameChangeHost => route!(ClientTargetUser => handle_change_host),
        PacketId::ClientGameChangeRuleset => route!(ClientChangeRuleset => handle_change_ruleset),
        PacketId::ClientGameChangeTeam => route!(ClientChangeTeam => handle_change_team),
        PacketId::ClientGameKickPlayer => route!(ClientTargetUser => handle_kick_player),
        PacketId::ClientGameHostRotation => route!(ClientToggle => handle_host_rotation),
        PacketId::ClientGameTournamentMode => route!(ClientToggle => handle_tournament_mode),
        PacketId::ClientGameSetReferee => route!(ClientSetReferee => handle_set_referee),
        PacketId::ClientGameChangeDifficultyFilter => {
            route!(ClientChangeDifficultyFilter => handle_difficulty_filter)
        }
        PacketId::ClientGameChangeMaxSongLength => {
            route!(ClientChangeMaxSongLength => handle_max_song_length)
        }
        PacketId::ClientGameChangeLongNoteFilter => {
            route!(ClientChangeLongNoteFilter => handle_long_note_filter)
        }
        PacketId::ClientGameChangeMinAudioRate => {
            route!(ClientChangeMinAudioRate => handle_min_audio_rate)
        }
        PacketId::ClientGameChangeAllowedModes => {
            route!(ClientChangeAllowedModes => handle_allowed_modes)
        }
        PacketId::ClientGameJudgements => route!(ClientJudgements => handle_judgements),
        PacketId::ClientGamePlayerFinished => route!(ClientEmpty => handle_player_finished),
        PacketId::ClientGameInvite => route!(ClientTargetUser => handle_invite),
        _ => return None,
    };
    Some(handler)
}

impl GameServer {
    /// Route one inbound text frame. Returns true when a handler ran.
    pub async fn dispatch(&self, connection_id: ConnectionId, frame: &str) -> bool {
        let Some(session) = self.sessions.by_connection(connection_id).await else {
            self.metrics.increment_unauthenticated_packets();
            tracing::warn!(%connection_id, "received packet while not authenticated");
            return false;
        };

        let id = match decode_envelope(frame) {
            Ok(id) => id,
            Err(err) => {
                self.metrics.increment_packets_dropped();
                tracing::warn!(user_id = session.id(), error = %err, "Dropping undecodable frame");
                return false;
            }
        };

        if !id.is_client_originated() {
            self.metrics.increment_packets_dropped();
            tracing::warn!(user_id = session.id(), packet = %id, "Dropping server-direction packet");
            return false;
        }

        let Some(handler) = handler_for(id) else {
            self.metrics.increment_packets_dropped();
            tracing::warn!(user_id = session.id(), packet = %id, "No handler for packet");
            return false;
        };

        tracing::trace!(user_id = session.id(), packet = %id, "Dispatching packet");
        handler(self, &session, frame).await;
        self.metrics.increment_packets_handled();
        true
    }
}
