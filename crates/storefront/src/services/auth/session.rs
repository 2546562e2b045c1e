//! Server-side sessions.
//!
//! The browser holds a random token; the database holds its SHA-256 digest
//! and an expiry. Sessions live for 30 days and are pushed forward by
//! another 30 days when used after their half-life, so active customers stay
//! signed in while abandoned sessions age out.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, TimeDelta, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::instrument;

use balance_botanica_core::UserId;

use super::AuthError;
use crate::db::{SessionRepository, UserRepository, from_millis};
use crate::models::{AuthenticatedSession, Session};

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "bb_session";

/// Session lifetime in days.
pub const SESSION_TTL_DAYS: i64 = 30;

/// Random bytes per token.
const TOKEN_BYTES: usize = 32;

/// Full session lifetime.
#[must_use]
pub fn session_ttl() -> TimeDelta {
    TimeDelta::days(SESSION_TTL_DAYS)
}

/// What validation should do with a stored session at `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    /// Past expiry: delete it.
    Expired,
    /// Valid, nothing to write.
    Valid,
    /// Valid and past half-life: extend to the given expiry.
    Renew(DateTime<Utc>),
}

/// Decide what to do with a session expiring at `expires_at`.
#[must_use]
pub fn check_expiry(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> SessionCheck {
    if now >= expires_at {
        return SessionCheck::Expired;
    }
    if now >= expires_at - session_ttl() / 2 {
        return SessionCheck::Renew(now + session_ttl());
    }
    SessionCheck::Valid
}

/// Generate a fresh cookie token.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Storage id for a token.
#[must_use]
pub fn session_id_for(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// A newly created session and the token to hand to the browser.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

/// Session service.
#[derive(Clone)]
pub struct SessionService {
    pool: SqlitePool,
}

impl SessionService {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Start a session for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the row cannot be written.
    #[instrument(skip(self))]
    pub async fn create(&self, user_id: &UserId) -> Result<IssuedSession, AuthError> {
        self.create_at(user_id, Utc::now()).await
    }

    /// [`create`](Self::create) with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the row cannot be written.
    pub async fn create_at(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, AuthError> {
        let token = generate_token();
        // Stored with millisecond precision; keep the returned value identical.
        let expires_at = from_millis((now + session_ttl()).timestamp_millis())?;
        let session = Session {
            id: session_id_for(&token),
            user_id: user_id.clone(),
            expires_at,
        };
        SessionRepository::new(&self.pool).insert(&session).await?;
        Ok(IssuedSession { token, session })
    }

    /// Resolve a cookie token to a live session.
    ///
    /// Returns `None` for unknown, expired, or orphaned tokens. Expired rows
    /// are deleted; sessions past half-life are extended and marked fresh.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` on storage failure.
    pub async fn validate(&self, token: &str) -> Result<Option<AuthenticatedSession>, AuthError> {
        self.validate_at(token, Utc::now()).await
    }

    /// [`validate`](Self::validate) with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` on storage failure.
    pub async fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthenticatedSession>, AuthError> {
        let sessions = SessionRepository::new(&self.pool);
        let Some(mut session) = sessions.get(&session_id_for(token)).await? else {
            return Ok(None);
        };

        let fresh = match check_expiry(session.expires_at, now) {
            SessionCheck::Expired => {
                sessions.delete(&session.id).await?;
                tracing::debug!(user_id = %session.user_id, "Deleted expired session");
                return Ok(None);
            }
            SessionCheck::Valid => false,
            SessionCheck::Renew(expires_at) => {
                sessions.extend(&session.id, expires_at).await?;
                session.expires_at = expires_at;
                true
            }
        };

        let Some(user) = UserRepository::new(&self.pool)
            .get_by_id(&session.user_id)
            .await?
        else {
            sessions.delete(&session.id).await?;
            return Ok(None);
        };

        Ok(Some(AuthenticatedSession {
            session,
            user,
            fresh,
        }))
    }

    /// End one session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` on storage failure.
    pub async fn invalidate(&self, session_id: &str) -> Result<(), AuthError> {
        Ok(SessionRepository::new(&self.pool).delete(session_id).await?)
    }

    /// End every session of a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` on storage failure.
    pub async fn invalidate_all(&self, user_id: &UserId) -> Result<u64, AuthError> {
        Ok(SessionRepository::new(&self.pool)
            .delete_for_user(user_id)
            .await?)
    }

    /// Delete every expired session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` on storage failure.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let removed = SessionRepository::new(&self.pool)
            .delete_expired(Utc::now())
            .await?;
        tracing::info!(removed, "Purged expired sessions");
        Ok(removed)
    }
}
