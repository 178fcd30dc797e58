//! JSON message types for the client-facing WebSocket protocol.
//!
//! # Message flow
//!
//! ```text
//! Client → Broker:  JSON text frame  →  ClientMessage
//! Broker → Client:  ServerMessage    →  JSON text frame
//! ```
//!
//! # JSON discriminant
//!
//! Every message is a JSON object with a `"type"` field that identifies the
//! variant.  All other fields are flattened into the same object and use
//! camelCase names.  For example:
//!
//! ```json
//! {"type":"offer","offer":{"sdp":"v=0..."},"userId":1,"targetUserId":2}
//! ```
//!
//! Serde's `#[serde(tag = "type")]` attribute handles this automatically.
//!
//! # Opaque payloads
//!
//! Chat bodies and the offer/answer/candidate blobs are carried as
//! [`serde_json::Value`].  The broker never looks inside them; whatever the
//! sender put there reaches the recipient byte-for-byte equivalent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ids::{GroupId, UserId};

// ── Client → Broker messages ──────────────────────────────────────────────────

/// All messages a client can send to the broker.
///
/// # Serde representation
///
/// ```json
/// {"type":"join","interests":"chess"}
/// {"type":"message","groupId":"chess-1700000000000","message":"hi","userId":3}
/// {"type":"leave","userId":3,"groupId":"chess-1700000000000"}
/// {"type":"candidate","candidate":{"candidate":"..."},"userId":3,"targetUserId":4}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Client declares its interest tag and enters the waiting pool.
    Join {
        /// The interest tag used to bucket clients together.
        interests: String,
    },

    /// Chat message to be broadcast to every member of a group.
    Message {
        group_id: GroupId,
        message: Value,
        /// Sender identity as claimed by the client.
        user_id: UserId,
    },

    /// Client removes an identity from a group's membership.
    Leave { user_id: UserId, group_id: GroupId },

    /// Peer-connection offer to relay to one target.
    Offer {
        offer: Value,
        user_id: UserId,
        target_user_id: UserId,
    },

    /// Peer-connection answer to relay to one target.
    Answer {
        answer: Value,
        user_id: UserId,
        target_user_id: UserId,
    },

    /// Connectivity candidate to relay to one target.
    Candidate {
        candidate: Value,
        user_id: UserId,
        target_user_id: UserId,
    },

    /// Any `type` string the broker does not know.  Ignored by the router.
    #[serde(other)]
    Unrecognized,
}

impl ClientMessage {
    /// Returns the wire name of this message's `type` field.
    ///
    /// Used in log lines so that chat bodies and signaling blobs never end up
    /// in the logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::Message { .. } => "message",
            ClientMessage::Leave { .. } => "leave",
            ClientMessage::Offer { .. } => "offer",
            ClientMessage::Answer { .. } => "answer",
            ClientMessage::Candidate { .. } => "candidate",
            ClientMessage::Unrecognized => "unrecognized",
        }
    }
}

// ── Broker → Client messages ──────────────────────────────────────────────────

/// All messages the broker sends to clients.
///
/// # Serde representation
///
/// ```json
/// {"type":"group_formed","groupId":"chess-1700000000000"}
/// {"type":"message","message":"hi","userId":3}
/// {"type":"answer","answer":{"sdp":"v=0..."},"userId":4}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// The recipient has been placed in a new group.
    GroupFormed { group_id: GroupId },

    /// Chat message broadcast within a group.
    Message { message: Value, user_id: UserId },

    /// Relayed offer; `user_id` is the sender.
    Offer { offer: Value, user_id: UserId },

    /// Relayed answer; `user_id` is the sender.
    Answer { answer: Value, user_id: UserId },

    /// Relayed candidate; `user_id` is the sender.
    Candidate { candidate: Value, user_id: UserId },
}

impl ServerMessage {
    /// Returns the wire name of this message's `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::GroupFormed { .. } => "group_formed",
            ServerMessage::Message { .. } => "message",
            ServerMessage::Offer { .. } => "offer",
            ServerMessage::Answer { .. } => "answer",
            ServerMessage::Candidate { .. } => "candidate",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_deserializes_from_json() {
        // Arrange: simulate what a client would send
        let json = r#"{"type":"join","interests":"chess"}"#;

        // Act
        let msg: ClientMessage = serde_json::from_str(json).unwrap();

        // Assert
        assert_eq!(
            msg,
            ClientMessage::Join {
                interests: "chess".to_string()
            }
        );
    }

    #[test]
    fn test_message_uses_camel_case_field_names() {
        let json = r#"{"type":"message","groupId":"g-1","message":"hello","userId":3}"#;

        let msg: ClientMessage = serde_json::from_str(json).unwrap();

        match msg {
            ClientMessage::Message {
                group_id,
                message,
                user_id,
            } => {
                assert_eq!(group_id.as_str(), "g-1");
                assert_eq!(message, json!("hello"));
                assert_eq!(user_id, UserId(3));
            }
            other => panic!("expected Message, got {:?}", other),
        }
    }

    #[test]
    fn test_offer_keeps_structured_payload() {
        let json = r#"{
            "type": "offer",
            "offer": {"type": "offer", "sdp": "v=0\r\n"},
            "userId": 1,
            "targetUserId": 2
        }"#;

        let msg: ClientMessage = serde_json::from_str(json).unwrap();

        assert_eq!(
            msg,
            ClientMessage::Offer {
                offer: json!({"type": "offer", "sdp": "v=0\r\n"}),
                user_id: UserId(1),
                target_user_id: UserId(2),
            }
        );
    }

    #[test]
    fn test_unknown_type_maps_to_unrecognized() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping","n":1}"#).unwrap();
        assert_eq!(msg, ClientMessage::Unrecognized);
    }

    #[test]
    fn test_known_type_with_missing_field_is_rejected() {
        // `leave` without `groupId` must not silently decode.
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"leave","userId":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_group_formed_serializes_with_snake_case_type() {
        let msg = ServerMessage::GroupFormed {
            group_id: GroupId::new("x-5"),
        };

        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value, json!({"type": "group_formed", "groupId": "x-5"}));
    }

    #[test]
    fn test_relayed_candidate_carries_sender_only() {
        let msg = ServerMessage::Candidate {
            candidate: json!({"candidate": "candidate:1 1 udp 2122260223 10.0.0.2 54400 typ host"}),
            user_id: UserId(9),
        };

        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["type"], "candidate");
        assert_eq!(value["userId"], 9);
        assert!(value.get("targetUserId").is_none());
    }

    #[test]
    fn test_kind_names_match_wire_tags() {
        let join = ClientMessage::Join {
            interests: "a".to_string(),
        };
        let formed = ServerMessage::GroupFormed {
            group_id: GroupId::new("a-1"),
        };
        assert_eq!(join.kind(), "join");
        assert_eq!(ClientMessage::Unrecognized.kind(), "unrecognized");
        assert_eq!(formed.kind(), "group_formed");
    }
}
