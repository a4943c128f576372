//! Shared domain types for Collabrix: transcript turns, the directory
//! projection folded into chatbot prompts, and realtime wire events.

pub mod chat;
pub mod directory;
pub mod events;

pub use chat::{Role, Turn, render_conversation};
pub use directory::{
    DirectoryEntry, DirectorySource, DirectoryUser, Supplier, Tier, render_snapshot,
};
pub use events::{ClientEvent, ProtocolError, RECIPIENT_OFFLINE, ServerEvent};
