use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::error::HandshakeError;

/// Identity proof a client supplies with its upgrade request: an external
/// platform ticket plus the signature of the client build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginHandshake {
    pub ticket: String,
    #[serde(default)]
    pub signature: String,
}

impl LoginHandshake {
    /// Decode the `login` query value: base64 (standard alphabet) JSON.
    ///
    /// Form decoding of an unescaped query turns `+` into a space, so spaces
    /// are read back as `+`.
    pub fn decode(encoded: &str) -> Result<Self, HandshakeError> {
        let encoded = encoded.trim().replace(' ', "+");
        if encoded.is_empty() {
            return Err(HandshakeError::Missing);
        }
        let bytes = BASE64_STANDARD.decode(encoded.as_bytes())?;
        let handshake: Self = serde_json::from_slice(&bytes)?;
        if handshake.ticket.trim().is_empty() {
            return Err(HandshakeError::EmptyTicket);
        }
        Ok(handshake)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        Ok(BASE64_STANDARD.encode(serde_json::to_vec(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_encoded_handshake() {
        let handshake = LoginHandshake {
            ticket: "ticket-1".to_string(),
            signature: "build-7".to_string(),
        };
        let encoded = handshake.encode().unwrap();
        assert_eq!(LoginHandshake::decode(&encoded).unwrap(), handshake);
    }

    #[test]
    fn accepts_plus_signs_mangled_by_form_decoding() {
        // This document encodes with a plus sign.
        let handshake = LoginHandshake {
            ticket: ">>>".to_string(),
            signature: String::new(),
        };
        let encoded = handshake.encode().unwrap();
        assert!(encoded.contains('+'));
        let mangled = encoded.replace('+', " ");
        assert_eq!(LoginHandshake::decode(&mangled).unwrap(), handshake);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(matches!(
            LoginHandshake::decode("  "),
            Err(HandshakeError::Missing)
        ));
        assert!(matches!(
            LoginHandshake::decode("%%%"),
            Err(HandshakeError::Encoding(_))
        ));
        let not_json = BASE64_STANDARD.encode("plain text");
        assert!(matches!(
            LoginHandshake::decode(&not_json),
            Err(HandshakeError::Document(_))
        ));
        let empty_ticket = BASE64_STANDARD.encode(r#"{"ticket":" ","signature":"x"}"#);
        assert!(matches!(
            LoginHandshake::decode(&empty_ticket),
            Err(HandshakeError::EmptyTicket)
        ));
    }
}
