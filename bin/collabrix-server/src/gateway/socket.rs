//! WebSocket transport: handshake, reader loop and writer task.

use std::sync::Arc;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use collabrix_types::{ClientEvent, ServerEvent};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use super::Inbound;
use crate::auth::{AuthError, Claims, TokenIssuer};
use crate::error::ServerError;
use crate::middleware::auth::bearer_token;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct HandshakeQuery {
    pub token: Option<String>,
}

/// Verify the handshake token from the query string or the bearer header.
pub fn authenticate(
    tokens: &TokenIssuer,
    query_token: Option<&str>,
    headers: &HeaderMap,
) -> Result<Claims, AuthError> {
    let token = query_token
        .map(str::to_owned)
        .or_else(|| bearer_token(headers))
        .ok_or(AuthError::MissingToken)?;
    tokens.verify(&token)
}

/// `GET /ws`: refuse with 401 before upgrading unless the token verifies.
///
/// The token is checked before the upgrade headers, so an unauthenticated
/// caller always gets the 401.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HandshakeQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ServerError> {
    let claims = authenticate(&state.tokens, query.token.as_deref(), &headers).inspect_err(|e| {
        debug!(error = %e, "websocket handshake refused");
    })?;
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    Ok(ws.on_upgrade(move |socket| serve_connection(socket, state, claims.user_id)))
}

async fn serve_connection(socket: WebSocket, state: Arc<AppState>, user_id: String) {
    let gateway = &state.gateway;
    let (conn, mut outbox) = gateway.connect(&user_id);
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = outbox.recv().await {
            let frame = match event.to_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(event = event.name(), error = %e, "failed to encode event");
                    continue;
                }
            };
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
        sink.close().await.ok();
    });

    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(user_id = %conn.user_id, error = %e, "websocket read failed");
                break;
            }
        };

        match ClientEvent::parse(text.as_str()) {
            Ok(event) => gateway.dispatch(&conn, Inbound::from(event)).await,
            Err(e) => conn.emit(ServerEvent::Error {
                message: e.to_string(),
            }),
        }
    }

    gateway.dispatch(&conn, Inbound::Disconnect).await;
    // Last sender gone: the writer drains what is queued and stops.
    drop(conn);
    if let Err(e) = writer.await {
        warn!(error = %e, "websocket writer task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::scripted::ScriptedCompletion;
    use axum::http::header::AUTHORIZATION;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::{self, Message as WireMessage};
    use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn serve(state: Arc<AppState>) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = crate::routes::build(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn next_event(client: &mut Client) -> ServerEvent {
        loop {
            let message = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .expect("no frame within 5s")
                .expect("socket closed")
                .unwrap();
            if let WireMessage::Text(text) = message {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    fn tokens() -> TokenIssuer {
        TokenIssuer::new("ws-secret", Duration::from_secs(600))
    }

    #[test]
    fn query_token_is_verified() {
        let tokens = tokens();
        let token = tokens.issue("alice", false).unwrap();
        let claims = authenticate(&tokens, Some(&token), &HeaderMap::new()).unwrap();
        assert_eq!(claims.user_id, "alice");
    }

    #[test]
    fn bearer_header_is_accepted_when_query_is_absent() {
        let tokens = tokens();
        let token = tokens.issue("bob", false).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        let claims = authenticate(&tokens, None, &headers).unwrap();
        assert_eq!(claims.user_id, "bob");
    }

    #[test]
    fn missing_and_forged_tokens_are_refused() {
        let tokens = tokens();
        assert!(matches!(
            authenticate(&tokens, None, &HeaderMap::new()),
            Err(AuthError::MissingToken)
        ));

        let forged = TokenIssuer::new("other", Duration::from_secs(600))
            .issue("alice", false)
            .unwrap();
        assert!(matches!(
            authenticate(&tokens, Some(&forged), &HeaderMap::new()),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn upgrade_without_token_is_refused_on_the_wire() {
        let state = AppState::for_tests(Arc::new(ScriptedCompletion::reply("unused"))).await;
        let addr = serve(state).await;

        let err = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
            .await
            .unwrap_err();
        match err {
            tungstenite::Error::Http(response) => assert_eq!(response.status(), 401),
            other => panic!("expected http 401, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn frames_are_dispatched_until_close() {
        let state = AppState::for_tests(Arc::new(ScriptedCompletion::reply("hello alice"))).await;
        let token = state.tokens.issue("alice", false).unwrap();
        let addr = serve(state.clone()).await;

        let url = format!("ws://{addr}/ws?token={token}");
        let (mut client, _) = tokio_tungstenite::connect_async(url).await.unwrap();

        client.send(WireMessage::text("not json")).await.unwrap();
        assert!(matches!(next_event(&mut client).await, ServerEvent::Error { .. }));

        let frame = r#"{"event":"chatbot-message","data":{"message":"hi"}}"#;
        client.send(WireMessage::text(frame)).await.unwrap();
        assert_eq!(next_event(&mut client).await, ServerEvent::bot_reply("hello alice"));
        assert!(state.gateway.registry().is_online("alice"));

        client.close(None).await.unwrap();
        let mut offline = false;
        for _ in 0..100 {
            if !state.gateway.registry().is_online("alice") {
                offline = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(offline, "connection still registered after close");
    }
}
