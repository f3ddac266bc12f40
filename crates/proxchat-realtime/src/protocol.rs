//! JSON frame protocol for the duplex stream.
//!
//! Frames carry a `type` tag. Unknown inbound types fail the tagged
//! parse and are dropped silently at the reader. The cell code is
//! server-internal and never appears in an outbound frame.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use proxchat_service::message::ChatMessage;

/// Client → server frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inbound {
    /// A chat utterance.
    ChatMessage {
        content: String,
        #[serde(default)]
        timestamp: i64,
    },
    /// Application-level heartbeat.
    Ping,
}

/// Server → client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    ChatMessage {
        id: String,
        sender_id: String,
        username: String,
        content: String,
        /// Distance is filled per recipient where known; empty means
        /// omitted on the wire.
        #[serde(default, skip_serializing_if = "String::is_empty")]
        distance: String,
        timestamp: i64,
    },
    UserJoined {
        username: String,
        user_count: usize,
    },
    UserLeft {
        username: String,
        user_count: usize,
    },
    Pong {
        timestamp: i64,
    },
    Error {
        content: String,
        code: String,
    },
}

impl Frame {
    /// The outbound rendering of a stored chat message.
    pub fn chat(message: &ChatMessage) -> Self {
        Self::ChatMessage {
            id: message.id.clone(),
            sender_id: message.sender_id.clone(),
            username: message.username.clone(),
            content: message.content.clone(),
            distance: String::new(),
            timestamp: message.timestamp.timestamp(),
        }
    }

    /// An error frame with a message and a stable code.
    pub fn error(content: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
            code: code.into(),
        }
    }

    /// A pong stamped with the current timestamp.
    pub fn pong_now() -> Self {
        Self::Pong {
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// Envelope published on the broker channel `chat:{cell}`.
///
/// `origin` is the publishing node's id; the bridge drops envelopes it
/// published itself, since the local hub already delivered them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerEnvelope {
    pub origin: String,
    pub message: ChatMessage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn inbound_chat_parses() {
        let frame: Inbound =
            serde_json::from_str(r#"{"type":"chat_message","content":"hi","timestamp":123}"#)
                .unwrap();
        assert_eq!(
            frame,
            Inbound::ChatMessage {
                content: "hi".to_string(),
                timestamp: 123
            }
        );
    }

    #[test]
    fn inbound_ping_parses_without_payload() {
        let frame: Inbound = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(frame, Inbound::Ping);
    }

    #[test]
    fn unknown_inbound_types_fail_to_parse() {
        assert!(serde_json::from_str::<Inbound>(r#"{"type":"voice_offer","sdp":"x"}"#).is_err());
        assert!(serde_json::from_str::<Inbound>("not json").is_err());
    }

    #[test]
    fn chat_frame_never_exposes_the_cell() {
        let message = ChatMessage::new("s1", "SwiftFox1", "hi", "dr5regw", Duration::from_secs(60));
        let json = serde_json::to_string(&Frame::chat(&message)).unwrap();
        assert!(!json.contains("dr5regw"));
        assert!(!json.contains("cell"));
        assert!(!json.contains("geohash"));
        assert!(json.contains(r#""type":"chat_message""#));
    }

    #[test]
    fn empty_distance_is_omitted() {
        let message = ChatMessage::new("s1", "SwiftFox1", "hi", "dr5regw", Duration::from_secs(60));
        let json = serde_json::to_string(&Frame::chat(&message)).unwrap();
        assert!(!json.contains("distance"));
    }

    #[test]
    fn outbound_frames_use_snake_case_tags() {
        let json = serde_json::to_string(&Frame::UserJoined {
            username: "SwiftFox1".to_string(),
            user_count: 2,
        })
        .unwrap();
        assert!(json.contains(r#""type":"user_joined""#));
        assert!(json.contains(r#""user_count":2"#));

        let json = serde_json::to_string(&Frame::error("nope", "RATE_LIMIT")).unwrap();
        assert!(json.contains(r#""code":"RATE_LIMIT""#));
    }

    #[test]
    fn broker_envelope_roundtrip() {
        let message = ChatMessage::new("s1", "SwiftFox1", "hi", "dr5regw", Duration::from_secs(60));
        let envelope = BrokerEnvelope {
            origin: "node-1".to_string(),
            message,
        };
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: BrokerEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.origin, "node-1");
        assert_eq!(parsed.message.cell, "dr5regw");
    }
}
