//! Request extractors that reject with [`AppError`].
//!
//! Handlers take [`AppJson`] and [`AppQuery`] instead of axum's `Json` and
//! `Query` so a malformed body or query string answers with the usual
//! `{"error": "..."}` body and a 400.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        routing::post,
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    use balance_botanica_core::OrderStatus;

    use super::*;

    #[derive(Deserialize)]
    struct StatusBody {
        status: OrderStatus,
    }

    #[derive(Deserialize)]
    struct Filter {
        status: Option<OrderStatus>,
    }

    async fn echo(AppQuery(filter): AppQuery<Filter>, AppJson(body): AppJson<StatusBody>) -> String {
        format!("{:?} {}", filter.status, body.status)
    }

    fn router() -> Router {
        Router::new().route("/echo", post(echo))
    }

    async fn send(uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn test_unknown_variant_in_body_is_json_400() {
        let (status, body) = send("/echo", r#"{"status":"shipped"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("shipped"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_400() {
        let (status, body) = send("/echo", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_bad_query_is_json_400() {
        let (status, body) = send("/echo?status=lost", r#"{"status":"pending"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_valid_request_passes_through() {
        let request = Request::builder()
            .method("POST")
            .uri("/echo?status=confirmed")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"status":"cancelled"}"#))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
