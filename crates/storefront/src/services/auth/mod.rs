//! Authentication service.
//!
//! Sign-in is delegated to Supabase: the browser finishes OAuth there and
//! posts the access token here. We resolve it to an identity, make sure a
//! local user exists, and start a cookie session.

mod error;
pub mod session;

use std::sync::Arc;

pub use error::AuthError;
pub use session::{IssuedSession, SESSION_COOKIE, SessionService};

use tracing::instrument;

use super::ports::IdentityProvider;
use super::users::UserService;
use crate::models::User;

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    identity: Arc<dyn IdentityProvider>,
    users: UserService,
    sessions: SessionService,
}

impl AuthService {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        users: UserService,
        sessions: SessionService,
    ) -> Self {
        Self {
            identity,
            users,
            sessions,
        }
    }

    /// Exchange an identity-provider access token for a local session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is blank or the
    /// provider rejects it, `AuthError::IdentityProvider` if the provider
    /// cannot be reached, and `AuthError::User` if the account cannot be
    /// created (e.g. its email belongs to another user).
    #[instrument(skip_all)]
    pub async fn login_with_access_token(
        &self,
        access_token: &str,
    ) -> Result<(User, IssuedSession), AuthError> {
        let access_token = access_token.trim();
        if access_token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let identity = self.identity.user_for_token(access_token).await?;
        let user = self.users.get_or_create(&identity).await?;
        let issued = self.sessions.create(&user.id).await?;

        tracing::info!(user_id = %user.id, "User signed in");
        Ok((user, issued))
    }

    /// End a session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` on storage failure.
    pub async fn logout(&self, session_id: &str) -> Result<(), AuthError> {
        self.sessions.invalidate(session_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use balance_botanica_core::{Email, UserId};

    use super::*;
    use crate::db::create_memory_pool;
    use crate::services::ports::{Identity, IntegrationError};

    struct OneToken;

    #[async_trait]
    impl IdentityProvider for OneToken {
        async fn user_for_token(&self, token: &str) -> Result<Identity, IntegrationError> {
            if token != "good" {
                return Err(IntegrationError::Unauthorized("test"));
            }
            Ok(Identity {
                id: UserId::new("u1"),
                email: Email::parse("u1@example.com").unwrap(),
                first_name: None,
                last_name: None,
            })
        }
    }

    async fn service() -> (AuthService, SessionService) {
        let pool = create_memory_pool().await.unwrap();
        let sessions = SessionService::new(pool.clone());
        let auth = AuthService::new(Arc::new(OneToken), UserService::new(pool), sessions.clone());
        (auth, sessions)
    }

    #[tokio::test]
    async fn test_login_creates_user_and_session() {
        let (auth, sessions) = service().await;
        let (user, issued) = auth.login_with_access_token("good").await.unwrap();
        assert_eq!(user.id.as_str(), "u1");

        let session = sessions.validate(&issued.token).await.unwrap().unwrap();
        assert_eq!(session.user.id, user.id);

        // Signing in again reuses the user.
        let (again, _) = auth.login_with_access_token("good").await.unwrap();
        assert_eq!(again.created_at, user.created_at);
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let (auth, _) = service().await;
        assert!(matches!(
            auth.login_with_access_token("bad").await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            auth.login_with_access_token("  ").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_logout_ends_session() {
        let (auth, sessions) = service().await;
        let (_, issued) = auth.login_with_access_token("good").await.unwrap();
        auth.logout(&issued.session.id).await.unwrap();
        assert!(sessions.validate(&issued.token).await.unwrap().is_none());
    }
}
