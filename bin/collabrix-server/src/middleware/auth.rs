use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::{AuthError, Claims};
use crate::error::ServerError;
use crate::state::AppState;

pub const X_ACCESS_TOKEN: &str = "x-access-token";

/// Token from `Authorization: Bearer <token>`, falling back to `x-access-token`.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| headers.get(X_ACCESS_TOKEN).and_then(|v| v.to_str().ok()))
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
}

/// Verified caller of a protected route.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);
        let token = bearer_token(&parts.headers).ok_or(AuthError::MissingToken)?;
        let claims = state.tokens.verify(&token)?;
        Ok(AuthUser(claims))
    }
}
