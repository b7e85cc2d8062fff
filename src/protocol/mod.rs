// Protocol module: packet ids, wire shapes and two-pass frame decoding

pub mod error_codes;
pub mod messages;
pub mod packet_id;
pub mod types;

pub use error_codes::{JoinGameError, NotificationKind};
pub use messages::{
    GameView, MapIdentity, MapPayload, MatchFilters, PacketEnvelope, PlayerScore, ServerPacket,
};
pub use packet_id::{Direction, PacketId};
pub use types::{
    free_mod, ClientActivity, ClientStatus, ConnectionId, GameId, GameMode, Modifiers,
    ProcessInfo, Ruleset, Team, UserId, UserInfo,
};

use serde::de::DeserializeOwned;

/// Errors raised by the first decoding pass.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown packet id {0}")]
    UnknownId(i32),
}

/// First pass: read only the discriminator of an inbound frame.
pub fn decode_envelope(frame: &str) -> Result<PacketId, EnvelopeError> {
    let envelope: PacketEnvelope = serde_json::from_str(frame)?;
    PacketId::from_i32(envelope.id).ok_or(EnvelopeError::UnknownId(envelope.id))
}

/// Second pass: decode the full concrete shape. `None` on any failure so
/// handlers can no-op instead of acting on partial data.
pub fn decode_packet<T: DeserializeOwned>(frame: &str) -> Option<T> {
    match serde_json::from_str::<T>(frame) {
        Ok(packet) => Some(packet),
        Err(err) => {
            tracing::debug!(error = %err, "failed to decode packet body");
            None
        }
    }
}
