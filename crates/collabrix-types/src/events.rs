//! Realtime wire protocol.
//!
//! Every WebSocket text frame carries one JSON envelope:
//!
//! ```json
//! {"event": "chatbot-message", "data": {"message": "hi"}}
//! ```
//!
//! `data` may be omitted. For events that carry fields, a missing or `null`
//! `data` reads as an empty payload, so absent fields take their defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::chat::Turn;

/// Notice sent to a sender whose peer message could not be delivered.
pub const RECIPIENT_OFFLINE: &str = "Recipient not online";

/// Events a connected client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Ask for the caller's own transcript.
    GetChatHistory,
    /// Talk to the chatbot advisor.
    ChatbotMessage {
        #[serde(default)]
        message: String,
    },
    /// Point-to-point text for another online user.
    SendMessage {
        #[serde(rename = "recipientId")]
        recipient_id: String,
        #[serde(default)]
        username: String,
        #[serde(default)]
        content: String,
    },
}

/// Events the server pushes to a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    ChatHistory(Vec<Turn>),
    ChatHistoryError(String),
    ChatbotResponse {
        user: String,
        message: String,
    },
    ChatbotError(String),
    ReceiveMessage {
        #[serde(rename = "senderId")]
        sender_id: String,
        username: String,
        content: String,
    },
    MessageError(String),
    /// Frame could not be understood.
    Error {
        message: String,
    },
}

impl ServerEvent {
    /// Reply emitted after a successful chatbot turn.
    pub fn bot_reply(message: impl Into<String>) -> Self {
        ServerEvent::ChatbotResponse {
            user: "bot".to_owned(),
            message: message.into(),
        }
    }

    /// Logical event name as written on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::ChatHistory(_) => "chat-history",
            ServerEvent::ChatHistoryError(_) => "chat-history-error",
            ServerEvent::ChatbotResponse { .. } => "chatbot-response",
            ServerEvent::ChatbotError(_) => "chatbot-error",
            ServerEvent::ReceiveMessage { .. } => "receive-message",
            ServerEvent::MessageError(_) => "message-error",
            ServerEvent::Error { .. } => "error",
        }
    }

    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed event frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ClientEvent {
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let mut envelope: Value = serde_json::from_str(frame)?;
        if let Some(fields) = envelope.as_object_mut() {
            let has_payload = matches!(
                fields.get("event").and_then(Value::as_str),
                Some("chatbot-message" | "send-message")
            );
            if has_payload && fields.get("data").is_none_or(Value::is_null) {
                fields.insert("data".to_owned(), Value::Object(Map::new()));
            }
        }
        Ok(serde_json::from_value(envelope)?)
    }
}
