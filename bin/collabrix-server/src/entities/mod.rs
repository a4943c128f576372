//! Persistence layer.
//!
//! Each concern gets its own store trait ([`UserStore`], [`SessionStore`],
//! [`SupplierStore`]) implemented on [`SqliteStore`]. Trait methods use
//! `impl Future` in their signatures so no `async-trait` is needed here.
//!
//! Queries use the runtime-checked `sqlx::query` form, so no `DATABASE_URL`
//! is required at compile time. Timestamps are stored as RFC 3339 text.

pub mod dao;
pub mod session;
pub mod supplier;
pub mod user;

pub use dao::{ChatSession, ProfilePatch, UserRecord};

pub use session::SessionStore;
pub use supplier::SupplierStore;
pub use user::UserStore;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the SQLite database at `url` and run pending migrations.
    ///
    /// `url` should be a sqlx-compatible SQLite URL, e.g. `"sqlite://collabrix.db"`
    /// or `"sqlite::memory:"` for tests.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` opens its own database, so tests
        // pin the pool to a single connection that never gets recycled.
        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let pool = pool_options.connect_with(options).await?;
        // Path is resolved relative to CARGO_MANIFEST_DIR at compile time.
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

/// `LIMIT` value for a row cap where `0` means no cap; SQLite reads a
/// negative limit as unbounded.
pub(crate) fn sql_limit(limit: usize) -> i64 {
    if limit == 0 {
        -1
    } else {
        i64::try_from(limit).unwrap_or(i64::MAX)
    }
}

pub(crate) fn parse_timestamp(raw: &str, column: &'static str) -> DateTime<Utc> {
    raw.parse().unwrap_or_else(|e: chrono::ParseError| {
        tracing::warn!(raw = %raw, column, error = %e, "failed to parse timestamp; using now");
        Utc::now()
    })
}
