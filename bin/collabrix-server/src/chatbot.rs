//! Chatbot pipeline shared by the realtime gateway and the REST routes.
//!
//! One call to [`Chatbot::respond`] appends the user turn, builds the
//! directory snapshot, assembles the prompt, calls the completion service
//! once and appends the assistant turn. There is no rollback: if the
//! completion fails the user turn stays in the transcript.

use std::sync::Arc;

use collabrix_types::{DirectorySource, Turn, render_conversation};
use thiserror::Error;
use tracing::{info, warn};

use crate::completion::{CompletionClient, CompletionError};
use crate::directory::build_snapshot;
use crate::entities::{SessionStore, SqliteStore, SupplierStore};

const PROMPT_INSTRUCTIONS: &str = "Important:
- Format your answer in **Markdown**.
- Use bullet points, bold text, headings, etc. if helpful.
- No additional commentary outside your Markdown.";

#[derive(Debug, Error)]
pub enum ChatbotError {
    #[error("Message is required")]
    EmptyMessage,

    #[error("Query is required")]
    EmptyQuery,

    #[error("No suppliers found")]
    NoSuppliers,

    #[error("chat storage failed: {0}")]
    Store(#[from] sqlx::Error),

    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),
}

impl ChatbotError {
    /// Text safe to hand back to a connected client.
    pub fn client_message(&self) -> String {
        match self {
            ChatbotError::EmptyMessage | ChatbotError::EmptyQuery | ChatbotError::NoSuppliers => {
                self.to_string()
            }
            ChatbotError::Store(_) => "Could not save chat message.".to_owned(),
            ChatbotError::Completion(_) => "Chatbot is unavailable right now.".to_owned(),
        }
    }
}

pub struct Chatbot {
    store: SqliteStore,
    completion: Arc<dyn CompletionClient>,
    source: DirectorySource,
    directory_limit: usize,
    history_window: usize,
}

impl std::fmt::Debug for Chatbot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chatbot")
            .field("source", &self.source)
            .field("directory_limit", &self.directory_limit)
            .field("history_window", &self.history_window)
            .finish_non_exhaustive()
    }
}

impl Chatbot {
    pub fn new(
        store: SqliteStore,
        completion: Arc<dyn CompletionClient>,
        source: DirectorySource,
        directory_limit: usize,
        history_window: usize,
    ) -> Self {
        Self {
            store,
            completion,
            source,
            directory_limit,
            history_window,
        }
    }

    /// The caller's whole transcript; empty when no session exists.
    pub async fn history(&self, user_id: &str) -> Result<Vec<Turn>, ChatbotError> {
        Ok(self.store.history(user_id).await?)
    }

    /// Run one chatbot exchange for `user_id` and return the reply text.
    pub async fn respond(&self, user_id: &str, message: &str) -> Result<String, ChatbotError> {
        if message.trim().is_empty() {
            return Err(ChatbotError::EmptyMessage);
        }

        let session = self.store.append_turn(user_id, Turn::user(message)).await?;
        let snapshot = build_snapshot(&self.store, self.source, self.directory_limit).await?;
        let prompt = build_prompt(
            self.source,
            &snapshot,
            &render_conversation(session.recent_turns(self.history_window)),
        );
        info!(
            user_id,
            turns = session.turns.len(),
            prompt_len = prompt.len(),
            "calling completion service"
        );

        let reply = self.completion.complete(&prompt).await.inspect_err(|e| {
            warn!(user_id, error = %e, "completion failed; user turn kept");
        })?;

        self.store.append_turn(user_id, Turn::assistant(reply.as_str())).await?;
        Ok(reply)
    }

    /// Answer `query` using only the supplier directory as context.
    pub async fn supplier_answer(&self, query: &str) -> Result<String, ChatbotError> {
        if query.trim().is_empty() {
            return Err(ChatbotError::EmptyQuery);
        }
        let suppliers = self.store.list_suppliers(self.directory_limit).await?;
        if suppliers.is_empty() {
            return Err(ChatbotError::NoSuppliers);
        }

        let context = suppliers
            .iter()
            .map(|s| format!("{} in {} supplies: {}", s.name, s.location, s.supplies.join(", ")))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Answer the query using only the context below:\n{context}\n\nQuestion: {query}"
        );
        Ok(self.completion.complete(&prompt).await?)
    }
}

/// Assemble the advisor prompt from a rendered snapshot and conversation.
pub fn build_prompt(source: DirectorySource, snapshot: &str, conversation: &str) -> String {
    format!(
        "We have a list of {} in our system, each with certain fields:\n{snapshot}\n\n\
         Conversation so far:\n{conversation}\n\n{PROMPT_INSTRUCTIONS}",
        source.noun()
    )
}
