//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are converted to a
//! `{"error": "..."}` body with an appropriate status code.
//!
//! Internal errors (database, completion API) are logged with full detail
//! but only a generic message is returned to the caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::chatbot::ChatbotError;
use crate::completion::CompletionError;

/// All errors that can occur in the collabrix-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the SQLite store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Token or credential failure.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// The external completion service failed.
    #[error("completion error: {0}")]
    Completion(#[from] CompletionError),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authenticated, but not allowed to touch this resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ChatbotError> for ServerError {
    fn from(e: ChatbotError) -> Self {
        match e {
            ChatbotError::EmptyMessage | ChatbotError::EmptyQuery => {
                ServerError::BadRequest(e.to_string())
            }
            ChatbotError::NoSuppliers => ServerError::NotFound(e.to_string()),
            ChatbotError::Store(e) => ServerError::Database(e),
            ChatbotError::Completion(e) => ServerError::Completion(e),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),

            ServerError::Auth(e) => match e {
                AuthError::MissingToken => (
                    StatusCode::UNAUTHORIZED,
                    "Authentication error: No token".to_owned(),
                ),
                AuthError::InvalidToken(_) => (
                    StatusCode::UNAUTHORIZED,
                    "Authentication error: Invalid token".to_owned(),
                ),
                AuthError::InvalidCredentials => (StatusCode::BAD_REQUEST, e.to_string()),
                AuthError::Hashing(m) => {
                    error!(message = %m, "password hashing failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal server error".to_owned(),
                    )
                }
            },

            // Internal errors: log the full detail, keep it private.
            ServerError::Completion(e) => {
                error!(error = %e, "completion service error");
                (
                    StatusCode::BAD_GATEWAY,
                    "chatbot is unavailable".to_owned(),
                )
            }
            ServerError::Database(e) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = ?e, "converting anyhow error to ServerError::Internal");
        ServerError::Internal(e.to_string())
    }
}
