//! Session types.

use chrono::{DateTime, Utc};

use balance_botanica_core::UserId;

use super::User;

/// A stored session row.
///
/// `id` is the SHA-256 hex digest of the cookie token; the raw token is only
/// ever held by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

/// A validated session together with its user, attached to requests.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub session: Session,
    pub user: User,
    /// The expiry was pushed forward during validation and the cookie must be
    /// re-sent.
    pub fresh: bool,
}
