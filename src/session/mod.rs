//! Online user sessions and the registry that indexes them.

mod registry;
mod user;

pub use registry::{RegisterSessionError, SessionRegistry};
pub use user::{PacketSender, UserSession};
