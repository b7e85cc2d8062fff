use thiserror::Error;

/// Login handshake decoding failures.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("missing login handshake")]
    Missing,
    #[error("login handshake is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("login handshake is not a valid document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("login handshake has an empty ticket")]
    EmptyTicket,
}

/// Authentication errors returned while verifying a handshake.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Unsupported client build")]
    UnsupportedClient,
    #[error("Authenticator did not respond in time")]
    Timeout,
    #[error("Authenticator unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}
