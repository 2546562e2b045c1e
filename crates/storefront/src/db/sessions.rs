//! Session repository.
//!
//! Rows are keyed by the SHA-256 digest of the cookie token. Expiry is
//! decided by the session service, which passes `now` in explicitly.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use balance_botanica_core::UserId;

use super::{RepositoryError, from_millis};
use crate::models::Session;

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: String,
    user_id: String,
    expires_at: i64,
}

impl TryFrom<SessionRow> for Session {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: UserId::new(row.user_id),
            expires_at: from_millis(row.expires_at)?,
        })
    }
}

/// Repository for session rows.
pub struct SessionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a session row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails, including
    /// when the user does not exist (foreign key).
    pub async fn insert(&self, session: &Session) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO sessions (id, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.id)
            .bind(session.user_id.as_str())
            .bind(session.expires_at.timestamp_millis())
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::unique_violation(e, "session"))?;
        Ok(())
    }

    /// Look up a session by its hashed id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: &str) -> Result<Option<Session>, RepositoryError> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT id, user_id, expires_at FROM sessions WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        row.map(Session::try_from).transpose()
    }

    /// Move a session's expiry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session no longer exists.
    pub async fn extend(&self, id: &str, expires_at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ?")
            .bind(expires_at.timestamp_millis())
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete one session. Deleting a missing session is not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Delete every session of a user, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_user(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id.as_str())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions that expired at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
