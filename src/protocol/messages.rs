use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error_codes::{JoinGameError, NotificationKind};
use super::packet_id::PacketId;
use super::types::{
    ClientStatus, GameId, GameMode, Modifiers, ProcessInfo, Ruleset, Team, UserId, UserInfo,
};
use crate::scoring::{Judgement, ScoreSummary};

// ============================================================================
// Shared shapes
// ============================================================================

/// Map selection as supplied by a client; every field is clamped before use.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapPayload {
    #[serde(default)]
    pub md5: String,
    #[serde(default)]
    pub alternative_md5: String,
    #[serde(default = "default_negative_id")]
    pub map_id: i32,
    #[serde(default = "default_negative_id")]
    pub mapset_id: i32,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_game_mode")]
    pub game_mode: i32,
    #[serde(default)]
    pub difficulty_rating: f64,
    /// Difficulty per playback rate, 0.5x..=2.0x in 0.05x steps.
    #[serde(default)]
    pub difficulty_ratings_by_rate: Vec<f64>,
}

fn default_negative_id() -> i32 {
    -1
}

fn default_game_mode() -> i32 {
    GameMode::Keys4 as i32
}

/// Map selection after clamping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapIdentity {
    pub md5: String,
    pub alternative_md5: String,
    pub map_id: i32,
    pub mapset_id: i32,
    pub name: String,
    pub game_mode: GameMode,
    pub difficulty_rating: f64,
    pub difficulty_ratings_by_rate: Vec<f64>,
}

/// Matchmaking filters advertised to the lobby.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchFilters {
    pub min_difficulty: f64,
    pub max_difficulty: f64,
    pub max_song_length: i32,
    pub min_long_note_percent: i32,
    pub max_long_note_percent: i32,
    pub min_audio_rate: f64,
    pub allowed_game_modes: Vec<GameMode>,
}

/// Creation settings as supplied by a client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameSettingsPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_requested_players")]
    pub max_players: i32,
    #[serde(default)]
    pub ruleset: i32,
    #[serde(default)]
    pub free_mod_type: i32,
    #[serde(default)]
    pub modifiers: Modifiers,
    #[serde(default)]
    pub map: MapPayload,
    #[serde(default)]
    pub host_rotation: bool,
    #[serde(default)]
    pub tournament_mode: bool,
    #[serde(default)]
    pub min_difficulty: Option<f64>,
    #[serde(default)]
    pub max_difficulty: Option<f64>,
    #[serde(default)]
    pub max_song_length: Option<i32>,
    #[serde(default)]
    pub min_long_note_percent: Option<i32>,
    #[serde(default)]
    pub max_long_note_percent: Option<i32>,
    #[serde(default)]
    pub min_audio_rate: Option<f64>,
    #[serde(default)]
    pub allowed_game_modes: Option<Vec<i32>>,
}

fn default_requested_players() -> i32 {
    16
}

/// Public view of a match. Never carries the password.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameView {
    pub id: GameId,
    pub public_id: String,
    pub name: String,
    pub has_password: bool,
    pub max_players: i32,
    pub map: MapIdentity,
    pub ruleset: Ruleset,
    pub host_id: UserId,
    pub referee_id: Option<UserId>,
    pub player_ids: Vec<UserId>,
    pub players_without_map: Vec<UserId>,
    pub players_ready: Vec<UserId>,
    pub player_modifiers: BTreeMap<UserId, Modifiers>,
    pub red_team: Vec<UserId>,
    pub blue_team: Vec<UserId>,
    pub player_wins: BTreeMap<UserId, i32>,
    pub red_team_wins: i32,
    pub blue_team_wins: i32,
    pub in_progress: bool,
    pub countdown_started_at: i64,
    pub modifiers: Modifiers,
    pub free_mod_type: i32,
    pub tournament_mode: bool,
    pub host_rotation: bool,
    pub host_selecting_map: bool,
    pub enable_preview: bool,
    pub filters: MatchFilters,
}

// ============================================================================
// Client-originated packets
// ============================================================================

/// First decoding pass: only the discriminator.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PacketEnvelope {
    pub id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientPong {
    #[serde(default)]
    pub processes: Vec<ProcessInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientStatusUpdate {
    pub status: ClientStatus,
}

/// Shared shape of the "request something about these users" packets.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientUserListRequest {
    #[serde(default)]
    pub user_ids: Vec<UserId>,
}

/// Packets that carry nothing beyond their discriminator.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ClientEmpty {}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientCreateGame {
    pub game: GameSettingsPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientJoinGame {
    pub game_id: GameId,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientChangeMap {
    pub map: MapPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientChangeName {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientChangePassword {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientChangeMaxPlayers {
    pub max_players: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientChangeModifiers {
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientChangeFreeMod {
    pub free_mod_type: i32,
}

/// Shared shape of every boolean toggle packet.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClientToggle {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientProvidedDifficulties {
    #[serde(default)]
    pub difficulties: Vec<f64>,
}

/// Shared shape of packets targeting another user.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClientTargetUser {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClientSetReferee {
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClientChangeRuleset {
    pub ruleset: i32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClientChangeTeam {
    pub team: i32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClientChangeDifficultyFilter {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClientChangeMaxSongLength {
    pub seconds: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClientChangeLongNoteFilter {
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClientChangeMinAudioRate {
    pub rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientChangeAllowedModes {
    #[serde(default)]
    pub modes: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientJudgements {
    #[serde(default)]
    pub judgements: Vec<Judgement>,
}

// ============================================================================
// Server-originated packets
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginReplyPayload {
    pub user: UserInfo,
    pub session_token: String,
    pub online_users: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserIdPayload {
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPayload {
    pub user: UserInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserListPayload {
    pub user_ids: Vec<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInfoListPayload {
    pub users: Vec<UserInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStatusPayload {
    pub statuses: BTreeMap<UserId, ClientStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub kind: NotificationKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamePayload {
    pub game: GameView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameIdPayload {
    pub game_id: GameId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinFailedPayload {
    pub game_id: GameId,
    pub reason: JoinGameError,
}

/// Game-scoped event about one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamePlayerPayload {
    pub game_id: GameId,
    pub user_id: UserId,
}

/// Game-scoped boolean flag change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameFlagPayload {
    pub game_id: GameId,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameMapPayload {
    pub game_id: GameId,
    pub map: MapIdentity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameNamePayload {
    pub game_id: GameId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameMaxPlayersPayload {
    pub game_id: GameId,
    pub max_players: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameModifiersPayload {
    pub game_id: GameId,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GamePlayerModifiersPayload {
    pub game_id: GameId,
    pub user_id: UserId,
    pub modifiers: Modifiers,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameFreeModPayload {
    pub game_id: GameId,
    pub free_mod_type: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameDifficultiesPayload {
    pub game_id: GameId,
    pub difficulties: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameCountdownPayload {
    pub game_id: GameId,
    pub started_at: i64,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameEndedPayload {
    pub game_id: GameId,
    pub scores: Vec<PlayerScore>,
    pub player_wins: BTreeMap<UserId, i32>,
    pub red_team_wins: i32,
    pub blue_team_wins: i32,
}

/// Final result of one player in a finished match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerScore {
    pub user_id: UserId,
    pub team: Option<Team>,
    pub modifiers: Modifiers,
    #[serde(flatten)]
    pub summary: ScoreSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRulesetPayload {
    pub game_id: GameId,
    pub ruleset: Ruleset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameTeamPayload {
    pub game_id: GameId,
    pub user_id: UserId,
    pub team: Team,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameRefereePayload {
    pub game_id: GameId,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameFiltersPayload {
    pub game_id: GameId,
    pub filters: MatchFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameJudgementsPayload {
    pub game_id: GameId,
    pub user_id: UserId,
    pub judgements: Vec<Judgement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameInvitePayload {
    pub game_id: GameId,
    pub game_name: String,
    pub sender_id: UserId,
}

/// Every packet the server sends. Each variant maps to exactly one
/// server-direction [`PacketId`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerPacket {
    Ping {},
    LoginReply(LoginReplyPayload),
    UserConnected(UserPayload),
    UserDisconnected(UserIdPayload),
    Notification(NotificationPayload),
    UserStatus(UserStatusPayload),
    UsersOnline(UserListPayload),
    UserInfo(UserInfoListPayload),
    GameInfo(GamePayload),
    GameDisbanded(GameIdPayload),
    GameJoinSuccess(GamePayload),
    GameJoinFailed(JoinFailedPayload),
    GamePlayerJoined(GamePlayerPayload),
    GamePlayerLeft(GamePlayerPayload),
    GameHostChanged(GamePlayerPayload),
    GameMapChanged(GameMapPayload),
    GameNameChanged(GameNamePayload),
    GamePasswordChanged(GameFlagPayload),
    GameMaxPlayersChanged(GameMaxPlayersPayload),
    GameModifiersChanged(GameModifiersPayload),
    GamePlayerModifiersChanged(GamePlayerModifiersPayload),
    GameFreeModChanged(GameFreeModPayload),
    GameHostSelectingMap(GameFlagPayload),
    GamePreviewChanged(GameFlagPayload),
    GameDifficultyRatingsChanged(GameDifficultiesPayload),
    GamePlayerHasMap(GamePlayerPayload),
    GamePlayerNoMap(GamePlayerPayload),
    GamePlayerReady(GamePlayerPayload),
    GamePlayerNotReady(GamePlayerPayload),
    GameCountdownStarted(GameCountdownPayload),
    GameCountdownStopped(GameIdPayload),
    GameStarted(GameIdPayload),
    GameEnded(GameEndedPayload),
    GameRulesetChanged(GameRulesetPayload),
    GameTeamChanged(GameTeamPayload),
    GameKicked(GameIdPayload),
    GameHostRotationChanged(GameFlagPayload),
    GameTournamentModeChanged(GameFlagPayload),
    GameRefereeChanged(GameRefereePayload),
    GameFiltersChanged(GameFiltersPayload),
    GameJudgements(GameJudgementsPayload),
    GamePlayerFinished(GamePlayerPayload),
    GameInvite(GameInvitePayload),
}

impl ServerPacket {
    pub const fn id(&self) -> PacketId {
        match self {
            Self::Ping {} => PacketId::ServerPing,
            Self::LoginReply(_) => PacketId::ServerLoginReply,
            Self::UserConnected(_) => PacketId::ServerUserConnected,
            Self::UserDisconnected(_) => PacketId::ServerUserDisconnected,
            Self::Notification(_) => PacketId::ServerNotification,
            Self::UserStatus(_) => PacketId::ServerUserStatus,
            Self::UsersOnline(_) => PacketId::ServerUsersOnline,
            Self::UserInfo(_) => PacketId::ServerUserInfo,
            Self::GameInfo(_) => PacketId::ServerGameInfo,
            Self::GameDisbanded(_) => PacketId::ServerGameDisbanded,
            Self::GameJoinSuccess(_) => PacketId::ServerGameJoinSuccess,
            Self::GameJoinFailed(_) => PacketId::ServerGameJoinFailed,
            Self::GamePlayerJoined(_) => PacketId::ServerGamePlayerJoined,
            Self::GamePlayerLeft(_) => PacketId::ServerGamePlayerLeft,
            Self::GameHostChanged(_) => PacketId::ServerGameHostChanged,
            Self::GameMapChanged(_) => PacketId::ServerGameMapChanged,
            Self::GameNameChanged(_) => PacketId::ServerGameNameChanged,
            Self::GamePasswordChanged(_) => PacketId::ServerGamePasswordChanged,
            Self::GameMaxPlayersChanged(_) => PacketId::ServerGameMaxPlayersChanged,
            Self::GameModifiersChanged(_) => PacketId::ServerGameModifiersChanged,
            Self::GamePlayerModifiersChanged(_) => PacketId::ServerGamePlayerModifiersChanged,
            Self::GameFreeModChanged(_) => PacketId::ServerGameFreeModChanged,
            Self::GameHostSelectingMap(_) => PacketId::ServerGameHostSelectingMap,
            Self::GamePreviewChanged(_) => PacketId::ServerGamePreviewChanged,
            Self::GameDifficultyRatingsChanged(_) => PacketId::ServerGameDifficultyRatingsChanged,
            Self::GamePlayerHasMap(_) => PacketId::ServerGamePlayerHasMap,
            Self::GamePlayerNoMap(_) => PacketId::ServerGamePlayerNoMap,
            Self::GamePlayerReady(_) => PacketId::ServerGamePlayerReady,
            Self::GamePlayerNotReady(_) => PacketId::ServerGamePlayerNotReady,
            Self::GameCountdownStarted(_) => PacketId::ServerGameCountdownStarted,
            Self::GameCountdownStopped(_) => PacketId::ServerGameCountdownStopped,
            Self::GameStarted(_) => PacketId::ServerGameStarted,
            Self::GameEnded(_) => PacketId::ServerGameEnded,
            Self::GameRulesetChanged(_) => PacketId::ServerGameRulesetChanged,
            Self::GameTeamChanged(_) => PacketId::ServerGameTeamChanged,
            Self::GameKicked(_) => PacketId::ServerGameKicked,
            Self::GameHostRotationChanged(_) => PacketId::ServerGameHostRotationChanged,
            Self::GameTournamentModeChanged(_) => PacketId::ServerGameTournamentModeChanged,
            Self::GameRefereeChanged(_) => PacketId::ServerGameRefereeChanged,
            Self::GameFiltersChanged(_) => PacketId::ServerGameFiltersChanged,
            Self::GameJudgements(_) => PacketId::ServerGameJudgements,
            Self::GamePlayerFinished(_) => PacketId::ServerGamePlayerFinished,
            Self::GameInvite(_) => PacketId::ServerGameInvite,
        }
    }

    /// Encode into a wire frame: the payload object plus its `id` discriminator.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        match value.as_object_mut() {
            Some(object) => {
                object.insert("id".to_string(), self.id().as_i32().into());
            }
            None => {
                return Err(serde::ser::Error::custom(
                    "server packet payload must serialize to an object",
                ))
            }
        }
        serde_json::to_string(&value)
    }
}
