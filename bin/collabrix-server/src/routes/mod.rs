//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - middleware layers (CORS, per-request trace id)
//! - optional Swagger UI / OpenAPI document (`COLLABRIX_ENABLE_SWAGGER=false` turns it off)
//! - `/health`
//! - `/api/users`, `/api/chat`, `/api/suppliers`
//! - `/ws`, the realtime gateway

mod chat;
pub mod doc;
mod health;
mod suppliers;
mod users;

use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

use crate::gateway::socket::ws_handler;
use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .nest("/api/users", users::router())
        .nest("/api/chat", chat::router())
        .nest("/api/suppliers", suppliers::router())
        .route("/ws", get(ws_handler));

    if state.config.enable_swagger {
        app = app.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()),
        );
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(&state)))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}
