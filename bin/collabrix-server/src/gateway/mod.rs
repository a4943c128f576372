//! Realtime gateway.
//!
//! [`socket`] does the handshake and frame I/O; this module owns the
//! registry and turns each inbound event into outbound events. Every
//! connection feeds its events through [`Gateway::dispatch`] one at a time,
//! so events of one connection are handled in arrival order.

pub mod registry;
pub mod socket;

use std::sync::Arc;

use collabrix_types::{ClientEvent, RECIPIENT_OFFLINE, ServerEvent};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chatbot::Chatbot;

pub use registry::ConnectionRegistry;

/// One authenticated socket.
#[derive(Debug)]
pub struct Connection {
    pub user_id: String,
    pub connection_id: Uuid,
    outbox: UnboundedSender<ServerEvent>,
}

impl Connection {
    /// Queue `event` for this connection only.
    pub fn emit(&self, event: ServerEvent) {
        let name = event.name();
        if self.outbox.send(event).is_err() {
            debug!(
                connection_id = %self.connection_id,
                event = name,
                "outbox closed; event dropped"
            );
        }
    }
}

/// Everything that can happen on a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    FetchHistory,
    ChatMessage(String),
    SendPeerMessage {
        recipient_id: String,
        sender_name: String,
        text: String,
    },
    /// Socket closed or failed; not a wire event.
    Disconnect,
}

impl From<ClientEvent> for Inbound {
    fn from(event: ClientEvent) -> Self {
        match event {
            ClientEvent::GetChatHistory => Inbound::FetchHistory,
            ClientEvent::ChatbotMessage { message } => Inbound::ChatMessage(message),
            ClientEvent::SendMessage {
                recipient_id,
                username,
                content,
            } => Inbound::SendPeerMessage {
                recipient_id,
                sender_name: username,
                text: content,
            },
        }
    }
}

pub struct Gateway {
    registry: ConnectionRegistry,
    chatbot: Arc<Chatbot>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway").field("registry", &self.registry).finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(chatbot: Arc<Chatbot>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            chatbot,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Register a fresh connection for an already verified `user_id`.
    /// The receiver yields everything addressed to this connection.
    pub fn connect(&self, user_id: &str) -> (Connection, UnboundedReceiver<ServerEvent>) {
        let (outbox, rx) = mpsc::unbounded_channel();
        let connection = Connection {
            user_id: user_id.to_owned(),
            connection_id: Uuid::new_v4(),
            outbox: outbox.clone(),
        };
        self.registry.register(user_id, connection.connection_id, outbox);
        info!(
            user_id,
            connection_id = %connection.connection_id,
            online = self.registry.connection_count(),
            "connection registered"
        );
        (connection, rx)
    }

    pub async fn dispatch(&self, conn: &Connection, inbound: Inbound) {
        match inbound {
            Inbound::FetchHistory => match self.chatbot.history(&conn.user_id).await {
                Ok(turns) => conn.emit(ServerEvent::ChatHistory(turns)),
                Err(e) => {
                    warn!(user_id = %conn.user_id, error = %e, "failed to fetch chat history");
                    conn.emit(ServerEvent::ChatHistoryError(
                        "Could not fetch chat history.".to_owned(),
                    ));
                }
            },

            Inbound::ChatMessage(message) => {
                match self.chatbot.respond(&conn.user_id, &message).await {
                    Ok(reply) => conn.emit(ServerEvent::bot_reply(reply)),
                    Err(e) => {
                        warn!(user_id = %conn.user_id, error = %e, "chatbot exchange failed");
                        conn.emit(ServerEvent::ChatbotError(e.client_message()));
                    }
                }
            }

            Inbound::SendPeerMessage {
                recipient_id,
                sender_name,
                text,
            } => {
                let event = ServerEvent::ReceiveMessage {
                    sender_id: conn.user_id.clone(),
                    username: sender_name,
                    content: text,
                };
                let delivered = self.registry.deliver_to_user(&recipient_id, &event);
                debug!(from = %conn.user_id, to = %recipient_id, delivered, "peer message routed");
                if delivered == 0 {
                    conn.emit(ServerEvent::MessageError(RECIPIENT_OFFLINE.to_owned()));
                }
            }

            Inbound::Disconnect => {
                self.registry.unregister(&conn.user_id, conn.connection_id);
                info!(
                    user_id = %conn.user_id,
                    connection_id = %conn.connection_id,
                    still_online = self.registry.is_online(&conn.user_id),
                    "connection closed"
                );
            }
        }
    }

    /// Forget every connection.
    pub fn shutdown(&self) {
        let count = self.registry.connection_count();
        self.registry.clear();
        info!(count, "connection registry cleared");
    }
}
