use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Numeric user identifier assigned by the account service.
pub type UserId = i32;
/// Database-assigned numeric match identifier.
pub type GameId = i64;
/// Modifier bitmask (rates, mirror, no-fail, ...).
pub type Modifiers = i64;
/// Identifies one live transport connection.
pub type ConnectionId = Uuid;

/// Public profile of an online user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub country: String,
    /// Group membership bitmask (developer, admin, moderator, ...).
    #[serde(default)]
    pub user_groups: i64,
    /// Privilege bitmask (normal, donator, ...).
    #[serde(default)]
    pub privileges: i64,
}

/// What the client is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum ClientActivity {
    #[default]
    Selecting,
    Playing,
    Paused,
    Watching,
    Editing,
    InLobby,
    Multiplayer,
    Listening,
}

impl TryFrom<i32> for ClientActivity {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, String> {
        Ok(match value {
            0 => Self::Selecting,
            1 => Self::Playing,
            2 => Self::Paused,
            3 => Self::Watching,
            4 => Self::Editing,
            5 => Self::InLobby,
            6 => Self::Multiplayer,
            7 => Self::Listening,
            other => return Err(format!("unknown client activity {other}")),
        })
    }
}

impl From<ClientActivity> for i32 {
    fn from(value: ClientActivity) -> Self {
        value as i32
    }
}

/// Mutable "rich presence" status a client reports.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientStatus {
    #[serde(default)]
    pub activity: ClientActivity,
    #[serde(default = "default_map_id")]
    pub map_id: i32,
    #[serde(default)]
    pub map_md5: String,
    #[serde(default)]
    pub game_mode: i32,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub modifiers: Modifiers,
}

fn default_map_id() -> i32 {
    -1
}

/// Key layout / game mode of a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum GameMode {
    #[default]
    Keys4 = 1,
    Keys7 = 2,
}

impl GameMode {
    pub const MIN: i32 = Self::Keys4 as i32;
    pub const MAX: i32 = Self::Keys7 as i32;

    /// Clamp an arbitrary client-supplied value into the valid mode range.
    pub fn from_clamped(raw: i32) -> Self {
        match raw.clamp(Self::MIN, Self::MAX) {
            1 => Self::Keys4,
            _ => Self::Keys7,
        }
    }
}

impl From<GameMode> for i32 {
    fn from(value: GameMode) -> Self {
        value as i32
    }
}

impl TryFrom<i32> for GameMode {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, String> {
        match value {
            1 => Ok(Self::Keys4),
            2 => Ok(Self::Keys7),
            other => Err(format!("unknown game mode {other}")),
        }
    }
}

/// Match format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Ruleset {
    #[default]
    FreeForAll = 0,
    Team = 1,
}

impl Ruleset {
    pub fn from_clamped(raw: i32) -> Self {
        if raw.clamp(0, 1) == 0 {
            Self::FreeForAll
        } else {
            Self::Team
        }
    }
}

impl From<Ruleset> for i32 {
    fn from(value: Ruleset) -> Self {
        value as i32
    }
}

impl TryFrom<i32> for Ruleset {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, String> {
        match value {
            0 => Ok(Self::FreeForAll),
            1 => Ok(Self::Team),
            other => Err(format!("unknown ruleset {other}")),
        }
    }
}

/// Free-mod bit flags: which modifier classes players may pick themselves.
pub mod free_mod {
    pub const NONE: i32 = 0;
    pub const REGULAR: i32 = 1 << 0;
    pub const RATE: i32 = 1 << 1;
    pub const ALL: i32 = REGULAR | RATE;

    /// Clamp to the valid bit range.
    pub fn clamp(raw: i32) -> i32 {
        raw.clamp(NONE, ALL)
    }
}

/// Team assignment under the team ruleset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Team {
    #[default]
    Red = 0,
    Blue = 1,
}

impl Team {
    pub fn from_clamped(raw: i32) -> Self {
        if raw.clamp(0, 1) == 0 {
            Self::Red
        } else {
            Self::Blue
        }
    }
}

impl From<Team> for i32 {
    fn from(value: Team) -> Self {
        value as i32
    }
}

impl TryFrom<i32> for Team {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, String> {
        match value {
            0 => Ok(Self::Red),
            1 => Ok(Self::Blue),
            other => Err(format!("unknown team {other}")),
        }
    }
}

/// One diagnostic entry reported in a heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    #[serde(default)]
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_clamp_out_of_range_values() {
        assert_eq!(GameMode::from_clamped(-4), GameMode::Keys4);
        assert_eq!(GameMode::from_clamped(9), GameMode::Keys7);
        assert_eq!(Ruleset::from_clamped(7), Ruleset::Team);
        assert_eq!(Ruleset::from_clamped(-1), Ruleset::FreeForAll);
        assert_eq!(Team::from_clamped(3), Team::Blue);
        assert_eq!(free_mod::clamp(99), free_mod::ALL);
        assert_eq!(free_mod::clamp(-2), free_mod::NONE);
    }

    #[test]
    fn client_status_serializes_activity_as_integer() {
        let status = ClientStatus {
            activity: ClientActivity::Multiplayer,
            ..ClientStatus::default()
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["activity"], 6);

        let parsed: ClientStatus = serde_json::from_str(r#"{"activity":1}"#).unwrap();
        assert_eq!(parsed.activity, ClientActivity::Playing);
        assert_eq!(parsed.map_id, -1);
    }
}
