//! Relational user table on SQLite.
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use gatekeeper_common::User;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;

use super::CredentialStore;
use crate::error::AppError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT    NOT NULL UNIQUE,
    password_hash TEXT    NOT NULL,
    roles         TEXT    NOT NULL
)
"#;

/// `users(id, username UNIQUE, password_hash, roles)` with roles kept as a
/// JSON array.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect and create the schema if needed
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        // Concurrent writers wait for the lock instead of failing with SQLITE_BUSY
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // ensure directory exists
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::Storage(format!("{}: {e}", parent.display())))?;
            }
        }

        // Every connection to `:memory:` opens its own empty database
        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and create the schema if needed
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, AppError> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        tracing::debug!("users table ready");
        Ok(Self { pool })
    }

    fn row_to_user(row: &SqliteRow) -> Result<User, AppError> {
        let roles: String = row.try_get("roles")?;
        let roles: BTreeSet<String> = serde_json::from_str(&roles)?;
        Ok(User {
            id: Some(row.try_get("id")?),
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            roles,
        })
    }
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, roles FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn save(&self, mut user: User) -> Result<User, AppError> {
        let roles = serde_json::to_string(&user.roles)?;
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (username, password_hash, roles) VALUES (?1, ?2, ?3)
             ON CONFLICT(username) DO UPDATE SET
                 password_hash = excluded.password_hash,
                 roles = excluded.roles
             RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(roles)
        .fetch_one(&self.pool)
        .await?;

        user.id = Some(id);
        Ok(user)
    }

    async fn create(&self, mut user: User) -> Result<User, AppError> {
        let roles = serde_json::to_string(&user.roles)?;
        let result: Result<i64, sqlx::Error> = sqlx::query_scalar(
            "INSERT INTO users (username, password_hash, roles) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(roles)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => {
                user.id = Some(id);
                Ok(user)
            },
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(AppError::DuplicateUsername(user.username))
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn count(&self) -> Result<usize, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        usize::try_from(count).map_err(|e| AppError::Storage(e.to_string()))
    }
}
