//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::ports::IntegrationError;
use crate::services::users::UserError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The identity provider did not accept the access token.
    #[error("invalid access token")]
    InvalidToken,

    /// The identity provider could not be asked.
    #[error("identity provider error: {0}")]
    IdentityProvider(IntegrationError),

    /// Creating or loading the user failed.
    #[error("user error: {0}")]
    User(#[from] UserError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<IntegrationError> for AuthError {
    fn from(e: IntegrationError) -> Self {
        match e {
            IntegrationError::Unauthorized(_) => Self::InvalidToken,
            other => Self::IdentityProvider(other),
        }
    }
}
