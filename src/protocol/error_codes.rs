use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a join attempt is refused. Sent to the requester only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum JoinGameError {
    #[error("the match no longer exists")]
    MatchNoExists,
    #[error("incorrect match password")]
    Password,
    #[error("the match is full")]
    Full,
}

impl JoinGameError {
    pub const fn code(self) -> i32 {
        match self {
            Self::MatchNoExists => 0,
            Self::Password => 1,
            Self::Full => 2,
        }
    }
}

impl From<JoinGameError> for i32 {
    fn from(value: JoinGameError) -> Self {
        value.code()
    }
}

impl TryFrom<i32> for JoinGameError {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, String> {
        match value {
            0 => Ok(Self::MatchNoExists),
            1 => Ok(Self::Password),
            2 => Ok(Self::Full),
            other => Err(format!("unknown join failure code {other}")),
        }
    }
}

/// Kinds of server notification toasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
}

impl From<NotificationKind> for i32 {
    fn from(value: NotificationKind) -> Self {
        match value {
            NotificationKind::Info => 0,
            NotificationKind::Warning => 1,
            NotificationKind::Error => 2,
        }
    }
}

impl TryFrom<i32> for NotificationKind {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, String> {
        match value {
            0 => Ok(Self::Info),
            1 => Ok(Self::Warning),
            2 => Ok(NotificationKind::Error),
            other => Err(format!("unknown notification kind {other}")),
        }
    }
}
