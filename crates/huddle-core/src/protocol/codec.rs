//! Text codec for the client-facing JSON protocol.
//!
//! Wire format: one JSON object per WebSocket text frame.
//!
//! ```text
//! {"type":<string>, ...type-specific fields}
//! ```
//!
//! Decoding never panics.  A frame that is not JSON, has no `type`, or has a
//! known `type` with missing or ill-typed fields yields
//! [`ProtocolError::Malformed`]; the caller drops that one frame and keeps the
//! connection open.

use thiserror::Error;

use crate::protocol::messages::{ClientMessage, ServerMessage};

/// Errors that can occur while decoding or encoding a frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The inbound frame could not be decoded into a [`ClientMessage`].
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The outbound message could not be serialized.
    #[error("failed to encode {kind} message: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one inbound text frame.
///
/// # Errors
///
/// Returns [`ProtocolError::Malformed`] if the frame is not a valid
/// `ClientMessage`.  Frames with an unknown `type` are *not* errors; they
/// decode to [`ClientMessage::Unrecognized`].
///
/// # Examples
///
/// ```rust
/// use huddle_core::protocol::{decode_client_message, ClientMessage};
///
/// let msg = decode_client_message(r#"{"type":"join","interests":"go"}"#).unwrap();
/// assert_eq!(msg, ClientMessage::Join { interests: "go".to_string() });
/// ```
pub fn decode_client_message(frame: &str) -> Result<ClientMessage, ProtocolError> {
    serde_json::from_str(frame).map_err(ProtocolError::Malformed)
}

/// Encodes one outbound message as a compact JSON string.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.  With the
/// current message set this only happens for exotic `Value` payloads, but
/// the caller still treats it as "drop this delivery".
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|source| ProtocolError::Encode {
        kind: msg.kind(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
