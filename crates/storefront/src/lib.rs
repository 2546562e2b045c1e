//! Balance Botanica storefront library.
//!
//! The JSON API behind the shop: products, baskets, orders, customer
//! accounts and cookie sessions over one SQLite database, with Supabase for
//! identity and Cloudinary, Telegram and a spreadsheet web app as
//! integrations. Exposed as a library so the binary, the maintenance CLI and
//! the integration tests share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

use axum::{Router, body::Body, http::Request, middleware::from_fn, middleware::from_fn_with_state};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::routes(state.config().trust_proxy_headers))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::TestHarness;

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let harness = TestHarness::new(&[]).await.unwrap();
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "edge-42")
            .body(Body::empty())
            .unwrap();

        let response = app(harness.state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "edge-42");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let harness = TestHarness::new(&[]).await.unwrap();
        let request = Request::builder()
            .uri("/api/nope")
            .body(Body::empty())
            .unwrap();

        let response = app(harness.state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
