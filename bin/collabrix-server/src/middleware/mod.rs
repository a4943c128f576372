//! HTTP middleware stack: per-request trace id, CORS and the bearer
//! extractor for protected routes.

pub mod auth;
pub mod cors;
pub mod trace;

pub use auth::AuthUser;
