use crate::entities::{SqliteStore, dao::ChatSession, parse_timestamp};

use chrono::Utc;
use collabrix_types::{Role, Turn};
use sqlx::SqliteConnection;
use std::future::Future;
use std::str::FromStr;

pub trait SessionStore: Send + Sync + 'static {
    fn find_session(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<ChatSession>, sqlx::Error>> + Send;
    /// The stored session, or a new empty one that is not persisted until
    /// the first [`SessionStore::append_turn`].
    fn find_or_create_session(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<ChatSession, sqlx::Error>> + Send;
    /// Upsert the session row, insert `turn` and read back the transcript,
    /// all in one transaction.
    fn append_turn(
        &self,
        user_id: &str,
        turn: Turn,
    ) -> impl Future<Output = Result<ChatSession, sqlx::Error>> + Send;
    fn history(&self, user_id: &str) -> impl Future<Output = Result<Vec<Turn>, sqlx::Error>> + Send;
}

async fn load_session(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Option<ChatSession>, sqlx::Error> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT created_at, updated_at FROM chat_sessions WHERE user_id = ?1")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;
    let Some((created_at, updated_at)) = row else {
        return Ok(None);
    };

    let rows: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT role, content, created_at FROM chat_turns WHERE user_id = ?1 ORDER BY id ASC",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    let turns = rows
        .into_iter()
        .filter_map(|(role, content, created_at)| match Role::from_str(&role) {
            Ok(role) => Some(Turn {
                role,
                content,
                timestamp: parse_timestamp(&created_at, "chat_turns.created_at"),
            }),
            Err(_) => {
                tracing::warn!(user_id, role = %role, "skipping turn with unknown role");
                None
            }
        })
        .collect();

    Ok(Some(ChatSession {
        user_id: user_id.to_owned(),
        turns,
        created_at: parse_timestamp(&created_at, "chat_sessions.created_at"),
        updated_at: parse_timestamp(&updated_at, "chat_sessions.updated_at"),
    }))
}

impl SessionStore for SqliteStore {
    async fn find_session(&self, user_id: &str) -> Result<Option<ChatSession>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        load_session(&mut conn, user_id).await
    }

    async fn find_or_create_session(&self, user_id: &str) -> Result<ChatSession, sqlx::Error> {
        Ok(self
            .find_session(user_id)
            .await?
            .unwrap_or_else(|| ChatSession::empty(user_id)))
    }

    async fn append_turn(&self, user_id: &str, turn: Turn) -> Result<ChatSession, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        // Writing first takes the write lock up front, so concurrent appends
        // queue behind each other instead of failing on lock upgrade.
        sqlx::query(
            "INSERT INTO chat_sessions (user_id, created_at, updated_at) VALUES (?1, ?2, ?2) \
             ON CONFLICT (user_id) DO UPDATE SET updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO chat_turns (user_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(user_id)
        .bind(turn.role.as_ref())
        .bind(&turn.content)
        .bind(turn.timestamp.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let session = load_session(&mut tx, user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        tx.commit().await?;
        Ok(session)
    }

    async fn history(&self, user_id: &str) -> Result<Vec<Turn>, sqlx::Error> {
        Ok(self.find_or_create_session(user_id).await?.turns)
    }
}
