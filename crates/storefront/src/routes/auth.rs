//! Sign-in and sign-out.
//!
//! The browser completes OAuth with Supabase and posts the resulting access
//! token to `/api/auth/callback`; we answer with the local user and a
//! `bb_session` cookie.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;

use super::user::SessionResponse;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::extract::AppJson;
use crate::middleware::OptionalAuth;
use crate::middleware::session::{append_cookie, clearing_cookie, session_cookie};
use crate::state::AppState;

/// Body of `POST /api/auth/callback`.
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    pub access_token: String,
}

/// Exchange a Supabase access token for a session.
///
/// POST /api/auth/callback
///
/// # Errors
///
/// 401 if the token is rejected, 502 if Supabase cannot be reached.
pub async fn callback(
    State(state): State<AppState>,
    AppJson(req): AppJson<CallbackRequest>,
) -> Result<Response> {
    let (user, issued) = state
        .auth()
        .login_with_access_token(&req.access_token)
        .await?;

    set_sentry_user(&user.id, Some(user.email.as_str()));

    let cookie = session_cookie(
        &issued.token,
        issued.session.expires_at,
        Utc::now(),
        state.config().secure_cookies(),
    );
    let mut response = Json(SessionResponse::signed_in(user)).into_response();
    append_cookie(response.headers_mut(), &cookie);
    Ok(response)
}

/// End the current session, if any, and clear the cookie.
///
/// POST /api/auth/logout
///
/// # Errors
///
/// 500 if the session row cannot be deleted.
pub async fn logout(
    State(state): State<AppState>,
    OptionalAuth(current): OptionalAuth,
) -> Result<Response> {
    if let Some(current) = current {
        state.auth().logout(&current.session.id).await?;
        tracing::info!(user_id = %current.user.id, "User signed out");
        clear_sentry_user();
    }

    let mut response = Json(SessionResponse::anonymous()).into_response();
    append_cookie(
        response.headers_mut(),
        &clearing_cookie(state.config().secure_cookies()),
    );
    Ok(response)
}
