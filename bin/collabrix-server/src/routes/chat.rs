use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::middleware::AuthUser;
use crate::schemas::chat::{ChatRequest, ChatResponse, HistoryResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(chat_history, chat_with_bot),
    components(schemas(ChatRequest, ChatResponse, HistoryResponse))
)]
pub struct ChatApi;

/// Routes nested under `/api/chat`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/history", get(chat_history))
        .route("/", post(chat_with_bot))
}

#[utoipa::path(
    get,
    path = "/api/chat/history",
    tag = "chat",
    responses(
        (status = 200, description = "Caller's transcript", body = HistoryResponse),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer" = []))
)]
pub async fn chat_history(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
) -> Result<Json<HistoryResponse>, ServerError> {
    let messages = state.chatbot.history(&claims.user_id).await?;
    Ok(Json(HistoryResponse { messages }))
}

/// Same pipeline as the `chatbot-message` socket event.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Chatbot reply", body = ChatResponse),
        (status = 400, description = "Message is required"),
        (status = 401, description = "Missing or invalid token"),
        (status = 502, description = "Completion service failed"),
    ),
    security(("bearer" = []))
)]
pub async fn chat_with_bot(
    State(state): State<Arc<AppState>>,
    AuthUser(claims): AuthUser,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    let response = state.chatbot.respond(&claims.user_id, &req.message).await?;
    Ok(Json(ChatResponse { response }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::completion::scripted::ScriptedCompletion;

    fn caller(user_id: &str) -> AuthUser {
        AuthUser(Claims {
            user_id: user_id.into(),
            is_admin: false,
            iat: 0,
            exp: 0,
        })
    }

    #[tokio::test]
    async fn chat_round_trip_shows_up_in_history() {
        let state = AppState::for_tests(Arc::new(ScriptedCompletion::reply("hello alice"))).await;

        let Json(reply) = chat_with_bot(
            State(state.clone()),
            caller("alice"),
            Json(ChatRequest { message: "hi".into() }),
        )
        .await
        .unwrap();
        assert_eq!(reply.response, "hello alice");

        let Json(history) = chat_history(State(state), caller("alice")).await.unwrap();
        assert_eq!(history.messages.len(), 2);
    }

    #[tokio::test]
    async fn completion_failure_maps_to_bad_gateway_error() {
        let state = AppState::for_tests(Arc::new(ScriptedCompletion::failing())).await;
        let req = ChatRequest { message: "hi".into() };
        let err = chat_with_bot(State(state), caller("alice"), Json(req)).await.unwrap_err();
        assert!(matches!(err, ServerError::Completion(_)));
    }
}
