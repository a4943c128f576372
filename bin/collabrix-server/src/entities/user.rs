use crate::entities::{
    SqliteStore,
    dao::{ProfilePatch, UserRecord},
    parse_timestamp,
    sql_limit,
};

use chrono::Utc;
use std::future::Future;

const USER_COLUMNS: &str = "id, username, email, password_hash, is_admin, biography, \
     business_name, location, interests, expertise, points, created_at, updated_at";

pub trait UserStore: Send + Sync + 'static {
    fn create_user(
        &self,
        record: UserRecord,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn find_user_by_id(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;
    fn find_user_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;
    fn find_user_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;
    /// Any user holding either `email` or `username`.
    fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;
    /// Apply the non-`None` fields of `patch`; `None` when the user is unknown.
    fn update_profile(
        &self,
        id: &str,
        patch: ProfilePatch,
    ) -> impl Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;
    /// `points = points + delta` in a single statement.
    fn add_points(
        &self,
        id: &str,
        delta: f64,
    ) -> impl Future<Output = Result<Option<UserRecord>, sqlx::Error>> + Send;
    /// Users in insertion order, at most `limit` of them; `0` lists all.
    fn list_directory_users(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<UserRecord>, sqlx::Error>> + Send;
    fn random_users(
        &self,
        size: usize,
    ) -> impl Future<Output = Result<Vec<UserRecord>, sqlx::Error>> + Send;
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    is_admin: bool,
    biography: Option<String>,
    business_name: Option<String>,
    location: Option<String>,
    interests: Option<String>,
    expertise: Option<String>,
    points: f64,
    created_at: String,
    updated_at: String,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        UserRecord {
            created_at: parse_timestamp(&row.created_at, "users.created_at"),
            updated_at: parse_timestamp(&row.updated_at, "users.updated_at"),
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            is_admin: row.is_admin,
            biography: row.biography,
            business_name: row.business_name,
            location: row.location,
            interests: row.interests,
            expertise: row.expertise,
            points: row.points,
        }
    }
}

impl SqliteStore {
    async fn fetch_user_where(
        &self,
        clause: &str,
        value: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserRecord::from))
    }
}

impl UserStore for SqliteStore {
    async fn create_user(&self, record: UserRecord) -> Result<(), sqlx::Error> {
        let created_at = record.created_at.to_rfc3339();
        let updated_at = record.updated_at.to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, is_admin, biography, \
             business_name, location, interests, expertise, points, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(&record.id)
        .bind(&record.username)
        .bind(&record.email)
        .bind(&record.password_hash)
        .bind(record.is_admin)
        .bind(&record.biography)
        .bind(&record.business_name)
        .bind(&record.location)
        .bind(&record.interests)
        .bind(&record.expertise)
        .bind(record.points)
        .bind(&created_at)
        .bind(&updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        self.fetch_user_where("id = ?1", id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, sqlx::Error> {
        self.fetch_user_where("email = ?1", &email.to_lowercase()).await
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        self.fetch_user_where("username = ?1", username).await
    }

    async fn find_user_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1 OR username = ?2 LIMIT 1"
        );
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(email.to_lowercase())
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserRecord::from))
    }

    async fn update_profile(
        &self,
        id: &str,
        patch: ProfilePatch,
    ) -> Result<Option<UserRecord>, sqlx::Error> {
        let updated_at = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE users SET \
                 username = COALESCE(?1, username), \
                 biography = COALESCE(?2, biography), \
                 business_name = COALESCE(?3, business_name), \
                 location = COALESCE(?4, location), \
                 interests = COALESCE(?5, interests), \
                 expertise = COALESCE(?6, expertise), \
                 updated_at = ?7 \
             WHERE id = ?8",
        )
        .bind(&patch.username)
        .bind(&patch.biography)
        .bind(&patch.business_name)
        .bind(&patch.location)
        .bind(&patch.interests)
        .bind(&patch.expertise)
        .bind(&updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_user_by_id(id).await
    }

    async fn add_points(&self, id: &str, delta: f64) -> Result<Option<UserRecord>, sqlx::Error> {
        let updated_at = Utc::now().to_rfc3339();
        let result =
            sqlx::query("UPDATE users SET points = points + ?1, updated_at = ?2 WHERE id = ?3")
                .bind(delta)
                .bind(&updated_at)
                .bind(id)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_user_by_id(id).await
    }

    async fn list_directory_users(&self, limit: usize) -> Result<Vec<UserRecord>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY rowid ASC LIMIT ?1");
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    async fn random_users(&self, size: usize) -> Result<Vec<UserRecord>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY RANDOM() LIMIT ?1");
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(size as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(UserRecord::from).collect())
    }
}
