//! Shared application state injected into every Axum handler.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenIssuer;
use crate::chatbot::Chatbot;
use crate::completion::CompletionClient;
use crate::config::Config;
use crate::entities::SqliteStore;
use crate::gateway::Gateway;

/// State shared across all HTTP handlers and WebSocket connections.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Users, chat sessions and suppliers.
    pub store: Arc<SqliteStore>,
    /// Issues and verifies access tokens.
    pub tokens: Arc<TokenIssuer>,
    /// Chatbot pipeline, shared by REST and the gateway.
    pub chatbot: Arc<Chatbot>,
    /// Realtime gateway; owns the connection registry.
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(config: Config, store: SqliteStore, completion: Arc<dyn CompletionClient>) -> Self {
        let tokens = TokenIssuer::new(
            &config.token_key,
            Duration::from_secs(config.token_ttl_secs),
        );
        let chatbot = Arc::new(Chatbot::new(
            store.clone(),
            completion,
            config.directory_source,
            config.directory_limit,
            config.history_window,
        ));
        Self {
            gateway: Arc::new(Gateway::new(Arc::clone(&chatbot))),
            chatbot,
            tokens: Arc::new(tokens),
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
impl AppState {
    /// In-memory state around a scripted completion client.
    pub(crate) async fn for_tests(completion: Arc<dyn CompletionClient>) -> Arc<Self> {
        let config = Config::for_tests();
        let store = SqliteStore::connect(&config.database_url)
            .await
            .expect("in-memory store");
        Arc::new(Self::new(config, store, completion))
    }
}
