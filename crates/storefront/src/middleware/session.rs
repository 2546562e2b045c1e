//! Session cookie middleware.
//!
//! Resolves the `bb_session` cookie to an [`AuthenticatedSession`] once per
//! request and stores the result in the request extensions as
//! [`CurrentSession`]. Failure to resolve is never an error: the request just
//! proceeds anonymously.

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue,
        header::{COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use cookie::{Cookie, SameSite, time::Duration};

use crate::models::AuthenticatedSession;
use crate::services::auth::SESSION_COOKIE;
use crate::state::AppState;

/// The session resolved for this request, if any.
#[derive(Clone, Debug, Default)]
pub struct CurrentSession(pub Option<AuthenticatedSession>);

/// Read the session token from the `Cookie` headers.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
        .map(|c| c.value().to_owned())
}

/// Build the cookie carrying `token` until `expires_at`.
#[must_use]
pub fn session_cookie(
    token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    secure: bool,
) -> Cookie<'static> {
    let remaining = (expires_at - now).num_seconds().max(0);
    Cookie::build((SESSION_COOKIE, token.to_owned()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(Duration::seconds(remaining))
        .build()
}

/// Build a cookie that makes the browser drop the session token.
#[must_use]
pub fn clearing_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

/// Append `cookie` as a `Set-Cookie` header.
pub fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) {
    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => tracing::error!(error = %e, "Session cookie is not a valid header value"),
    }
}

enum CookieAction {
    Keep,
    Renew { token: String, expires_at: DateTime<Utc> },
    Clear,
}

/// Middleware that resolves the session cookie.
///
/// When the session was extended past its half-life the response carries a
/// renewed cookie; when the presented cookie no longer maps to a session it
/// carries a clearing cookie. A `Set-Cookie` written by the handler itself
/// (sign-in, sign-out) always wins.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session_token(request.headers());

    let (current, action) = match token {
        None => (None, CookieAction::Keep),
        Some(token) => match state.sessions().validate(&token).await {
            Ok(Some(session)) => {
                let action = if session.fresh {
                    CookieAction::Renew {
                        token,
                        expires_at: session.session.expires_at,
                    }
                } else {
                    CookieAction::Keep
                };
                (Some(session), action)
            }
            Ok(None) => (None, CookieAction::Clear),
            Err(e) => {
                // Keep the cookie: the session may well be valid once storage recovers.
                tracing::warn!(error = %e, "Session lookup failed, continuing anonymously");
                (None, CookieAction::Keep)
            }
        },
    };

    if let Some(session) = &current {
        tracing::Span::current().record("user_id", session.user.id.as_str());
    }

    request.extensions_mut().insert(CurrentSession(current));
    let mut response = next.run(request).await;

    if response.headers().contains_key(SET_COOKIE) {
        return response;
    }

    let secure = state.config().secure_cookies();
    match action {
        CookieAction::Keep => {}
        CookieAction::Renew { token, expires_at } => {
            let cookie = session_cookie(&token, expires_at, Utc::now(), secure);
            append_cookie(response.headers_mut(), &cookie);
        }
        CookieAction::Clear => append_cookie(response.headers_mut(), &clearing_cookie(secure)),
    }

    response
}
