//! Authentication extractors.
//!
//! Read the [`CurrentSession`] that [`session_middleware`] attached to the
//! request.
//!
//! [`session_middleware`]: super::session::session_middleware

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::session::CurrentSession;
use crate::models::{AuthenticatedSession, User};
use crate::state::AppState;

/// Error returned when a route needs a user (or an admin) it did not get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No session.
    Unauthorized,
    /// Signed in, but not an admin.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "Sign in required"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Admin access required"),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

fn current_session(parts: &Parts) -> Option<AuthenticatedSession> {
    parts
        .extensions
        .get::<CurrentSession>()
        .and_then(|current| current.0.clone())
}

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub User);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_session(parts)
            .map(|session| Self(session.user))
            .ok_or(AuthRejection::Unauthorized)
    }
}

/// Extractor that optionally gets the current session.
///
/// Unlike `RequireAuth`, this does not reject anonymous requests.
pub struct OptionalAuth(pub Option<AuthenticatedSession>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_session(parts)))
    }
}

/// Extractor that requires a user whose email is listed in `ADMIN_EMAILS`.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = current_session(parts).ok_or(AuthRejection::Unauthorized)?;
        if !state.config().is_admin(&session.user.email) {
            tracing::warn!(user_id = %session.user.id, "Admin route refused");
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(session.user))
    }
}
