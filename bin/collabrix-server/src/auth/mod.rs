//! Identity issuer: password hashing and signed access tokens.
//!
//! Registration and login live in [`crate::routes::users`]; the realtime
//! gateway and the bearer extractor only ever call [`TokenIssuer::verify`].

pub mod password;
pub mod token;

use thiserror::Error;

pub use password::{hash_password, verify_password};
pub use token::{Claims, TokenIssuer};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("Email or password incorrect")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}
