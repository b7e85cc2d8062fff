pub mod authenticator;
pub mod error;
pub mod handshake;

pub use authenticator::{Authenticator, StaticAuthenticator};
pub use error::{AuthError, HandshakeError};
pub use handshake::LoginHandshake;
