use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Which side of the connection is allowed to originate a packet kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by the game client, handled by the server.
    Client,
    /// Sent by the server, handled by the game client.
    Server,
}

macro_rules! packet_ids {
    (
        server { $($server:ident = $server_id:literal,)* }
        client { $($client:ident = $client_id:literal,)* }
    ) => {
        /// Stable wire discriminators.
        ///
        /// These integers are a compatibility contract with shipped clients:
        /// never renumber an existing entry, only append.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(i32)]
        pub enum PacketId {
            $($server = $server_id,)*
            $($client = $client_id,)*
        }

        impl PacketId {
            /// Every known discriminator, server-originated first.
            pub const ALL: &'static [PacketId] = &[
                $(PacketId::$server,)*
                $(PacketId::$client,)*
            ];

            pub const fn from_i32(value: i32) -> Option<Self> {
                match value {
                    $($server_id => Some(Self::$server),)*
                    $($client_id => Some(Self::$client),)*
                    _ => None,
                }
            }

            pub const fn direction(self) -> Direction {
                match self {
                    $(Self::$server => Direction::Server,)*
                    $(Self::$client => Direction::Client,)*
                }
            }
        }
    };
}

packet_ids! {
    server {
        ServerPing = 1,
        ServerLoginReply = 2,
        ServerUserConnected = 3,
        ServerUserDisconnected = 4,
        ServerChatMessage = 5,
        ServerJoinedChatChannel = 6,
        ServerLeftChatChannel = 7,
        ServerAvailableChatChannel = 8,
        ServerFailedToJoinChatChannel = 9,
        ServerMuteEndTime = 10,
        ServerNotification = 11,
        ServerUserStatus = 12,
        ServerUsersOnline = 13,
        ServerUserInfo = 14,
        ServerUserStats = 15,
        ServerGameInfo = 16,
        ServerGameDisbanded = 17,
        ServerGameJoinSuccess = 18,
        ServerGameJoinFailed = 19,
        ServerGamePlayerJoined = 20,
        ServerGamePlayerLeft = 21,
        ServerGameHostChanged = 22,
        ServerGameMapChanged = 23,
        ServerGameNameChanged = 24,
        ServerGamePasswordChanged = 25,
        ServerGameMaxPlayersChanged = 26,
        ServerGameModifiersChanged = 27,
        ServerGamePlayerModifiersChanged = 28,
        ServerGameFreeModChanged = 29,
        ServerGameHostSelectingMap = 30,
        ServerGamePreviewChanged = 31,
        ServerGameDifficultyRatingsChanged = 32,
        ServerGamePlayerHasMap = 33,
        ServerGamePlayerNoMap = 34,
        ServerGamePlayerReady = 35,
        ServerGamePlayerNotReady = 36,
        ServerGameCountdownStarted = 37,
        ServerGameCountdownStopped = 38,
        ServerGameStarted = 39,
        ServerGameEnded = 40,
        ServerGameRulesetChanged = 41,
        ServerGameTeamChanged = 42,
        ServerGameKicked = 43,
        ServerGameHostRotationChanged = 44,
        ServerGameTournamentModeChanged = 45,
        ServerGameRefereeChanged = 46,
        ServerGameFiltersChanged = 47,
        ServerGameJudgements = 48,
        ServerGamePlayerFinished = 49,
        ServerGameInvite = 50,
        ServerGameWinCounts = 51,
        ServerGameSpectatorJoined = 52,
        ServerGameSpectatorLeft = 53,
        ServerSpectateStarted = 54,
        ServerSpectatorJoined = 55,
        ServerSpectatorLeft = 56,
        ServerSpectatorReplayFrames = 57,
        ServerFriendsList = 58,
        ServerFriendAdded = 59,
        ServerFriendRemoved = 60,
        ServerTwitchConnection = 61,
        ServerTwitchDisconnection = 62,
        ServerSongRequest = 63,
        ServerSongRequestAccepted = 64,
        ServerUserGroupsChanged = 65,
        ServerMatchmakingQueued = 66,
        ServerMatchmakingDequeued = 67,
        ServerMatchmakingMatchFound = 68,
        ServerListeningPartyStateUpdate = 69,
        ServerListeningPartyJoined = 70,
        ServerListeningPartyLeft = 71,
        ServerListeningPartyInvite = 72,
        ServerListeningPartyChangeHost = 73,
        ServerListeningPartyFellowJoined = 74,
        ServerListeningPartyFellowLeft = 75,
        ServerServerAnnouncement = 76,
        ServerKicked = 77,
        ServerChatMessageDeleted = 78,
        ServerUserInfoUpdated = 79,
        ServerGameLockChanged = 80,
        ServerGameMatchLoaded = 81,
        ServerGamePlayerBattleRoyaleEliminated = 82,
        ServerGameAutoHostChanged = 83,
        ServerGameMapsetShared = 84,
    }
    client {
        ClientPong = 100,
        ClientChatMessage = 101,
        ClientJoinChatChannel = 102,
        ClientLeaveChatChannel = 103,
        ClientStatusUpdate = 104,
        ClientRequestUserInfo = 105,
        ClientRequestUserStats = 106,
        ClientRequestUserStatus = 107,
        ClientLobbyJoin = 108,
        ClientLobbyLeave = 109,
        ClientCreateGame = 110,
        ClientJoinGame = 111,
        ClientLeaveGame = 112,
        ClientGameChangeMap = 113,
        ClientGameChangeName = 114,
        ClientGameChangePassword = 115,
        ClientGameChangeMaxPlayers = 116,
        ClientGameChangeModifiers = 117,
        ClientGamePlayerChangeModifiers = 118,
        ClientGameChangeFreeMod = 119,
        ClientGameHostSelectingMap = 120,
        ClientGameEnablePreview = 121,
        ClientGameClientProvidedDifficulties = 122,
        ClientGamePlayerHasMap = 123,
        ClientGamePlayerNoMap = 124,
        ClientGamePlayerReady = 125,
        ClientGamePlayerNotReady = 126,
        ClientGameStartCountdown = 127,
        ClientGameStopCountdown = 128,
        ClientGameStart = 129,
        ClientGameChangeHost = 130,
        ClientGameChangeRuleset = 131,
        ClientGameChangeTeam = 132,
        ClientGameKickPlayer = 133,
        ClientGameHostRotation = 134,
        ClientGameTournamentMode = 135,
        ClientGameSetReferee = 136,
        ClientGameChangeDifficultyFilter = 137,
        ClientGameChangeMaxSongLength = 138,
        ClientGameChangeLongNoteFilter = 139,
        ClientGameChangeMinAudioRate = 140,
        ClientGameChangeAllowedModes = 141,
        ClientGameJudgements = 142,
        ClientGamePlayerFinished = 143,
        ClientGameInvite = 144,
        ClientSpectatePlayer = 145,
        ClientStopSpectating = 146,
        ClientSpectatorReplayFrames = 147,
        ClientAddFriend = 148,
        ClientRemoveFriend = 149,
        ClientRequestFriendsList = 150,
        ClientTwitchUnlink = 151,
        ClientRequestUsersOnline = 152,
        ClientSongRequestAccept = 153,
        ClientMatchmakingQueue = 154,
        ClientMatchmakingDequeue = 155,
        ClientListeningPartyStateUpdate = 156,
        ClientListeningPartyJoin = 157,
        ClientListeningPartyLeave = 158,
        ClientListeningPartyInvite = 159,
        ClientListeningPartyChangeHost = 160,
        ClientListeningPartyKick = 161,
        ClientGameLock = 162,
        ClientGameMatchLoaded = 163,
        ClientGameSkipRequest = 164,
        ClientGameAutoHost = 165,
        ClientGameShareMapset = 166,
        ClientDeleteChatMessage = 167,
        ClientReportUser = 168,
    }
}

impl PacketId {
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    pub const fn is_client_originated(self) -> bool {
        matches!(self.direction(), Direction::Client)
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.as_i32())
    }
}

impl Serialize for PacketId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32(self.as_i32())
    }
}

impl<'de> Deserialize<'de> for PacketId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = i32::deserialize(deserializer)?;
        Self::from_i32(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown packet id {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn discriminators_are_unique_and_round_trip() {
        let mut seen = HashSet::new();
        for id in PacketId::ALL {
            assert!(seen.insert(id.as_i32()), "duplicate discriminator {id}");
            assert_eq!(PacketId::from_i32(id.as_i32()), Some(*id));
        }
        assert!(PacketId::ALL.len() > 140);
    }

    #[test]
    fn directions_are_fixed_per_block() {
        assert_eq!(PacketId::ServerPing.direction(), Direction::Server);
        assert_eq!(PacketId::ClientPong.direction(), Direction::Client);
        assert!(PacketId::ALL
            .iter()
            .filter(|id| id.is_client_originated())
            .all(|id| id.as_i32() >= 100));
    }

    #[test]
    fn stable_values_for_shipped_clients() {
        assert_eq!(PacketId::ServerLoginReply.as_i32(), 2);
        assert_eq!(PacketId::ServerGameJoinFailed.as_i32(), 19);
        assert_eq!(PacketId::ClientJoinGame.as_i32(), 111);
        assert_eq!(PacketId::ClientGameStartCountdown.as_i32(), 127);
        assert_eq!(PacketId::from_i32(99), None);
    }
}
