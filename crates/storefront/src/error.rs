//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client with `{"error": "..."}`. All route
//! handlers return `Result<T, AppError>`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::orders::OrderError;
use crate::services::ports::IntegrationError;
use crate::services::products::ProductError;
use crate::services::sync::SyncError;
use crate::services::users::UserError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("User error: {0}")]
    User(#[from] UserError),

    #[error("Product error: {0}")]
    Product(#[from] ProductError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// An upstream service (Cloudinary, Supabase) failed.
    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

// Malformed bodies and query strings are validation failures: 400, JSON body.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

const INTERNAL: &str = "Internal server error";
const UPSTREAM: &str = "External service error";

fn repository_status(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        RepositoryError::Conflict(_) => (StatusCode::CONFLICT, "Already exists".to_string()),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
        }
    }
}

fn integration_status(err: &IntegrationError) -> (StatusCode, String) {
    match err {
        IntegrationError::NotConfigured(service) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("{service} is not configured"),
        ),
        _ => (StatusCode::BAD_GATEWAY, UPSTREAM.to_string()),
    }
}

impl AppError {
    /// Status code and client-safe message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(err) => repository_status(err),
            Self::User(err) => match err {
                UserError::AlreadyExists => (StatusCode::CONFLICT, err.to_string()),
                UserError::NotFound | UserError::AddressNotFound => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                UserError::InvalidEmail(_)
                | UserError::InvalidPhone(_)
                | UserError::InvalidField { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
                UserError::Repository(inner) => repository_status(inner),
            },
            Self::Product(err) => match err {
                ProductError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
                ProductError::AlreadyExists => (StatusCode::CONFLICT, err.to_string()),
                ProductError::Invalid(_) | ProductError::InvalidPrice(_) => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                ProductError::Repository(inner) => repository_status(inner),
            },
            Self::Order(err) => match err {
                OrderError::EmptyOrder
                | OrderError::InvalidQuantity(_)
                | OrderError::InvalidDelivery(_)
                | OrderError::InvalidPhone(_) => (StatusCode::BAD_REQUEST, err.to_string()),
                OrderError::ProductNotFound(_) | OrderError::NotFound => {
                    (StatusCode::NOT_FOUND, err.to_string())
                }
                OrderError::AccessDenied => (StatusCode::FORBIDDEN, err.to_string()),
                OrderError::InsufficientStock(_)
                | OrderError::InvalidTransition { .. }
                | OrderError::Conflict => (StatusCode::CONFLICT, err.to_string()),
                OrderError::IdExhausted | OrderError::Price(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string())
                }
                OrderError::Repository(inner) => repository_status(inner),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidToken => {
                    (StatusCode::UNAUTHORIZED, "Invalid access token".to_string())
                }
                AuthError::IdentityProvider(inner) => integration_status(inner),
                AuthError::User(inner) => Self::user_status(inner),
                AuthError::Repository(inner) => repository_status(inner),
            },
            Self::Sync(err) => match err {
                SyncError::AlreadyRunning => (StatusCode::CONFLICT, err.to_string()),
                SyncError::NotConfigured => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
            },
            Self::Integration(err) => integration_status(err),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
        }
    }

    fn user_status(err: &UserError) -> (StatusCode, String) {
        match err {
            // The identity provider handed us an email we cannot store.
            UserError::InvalidEmail(_) => (StatusCode::BAD_GATEWAY, UPSTREAM.to_string()),
            UserError::Repository(inner) => repository_status(inner),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use balance_botanica_core::{OrderStatus, ProductId};

    use super::*;

    fn get_status(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::NotFound),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_order_error_status_codes() {
        assert_eq!(get_status(OrderError::EmptyOrder), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(OrderError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(get_status(OrderError::AccessDenied), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(OrderError::InsufficientStock(ProductId::new("p1"))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Cancelled,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(get_status(OrderError::Conflict), StatusCode::CONFLICT);
    }

    #[test]
    fn test_service_error_status_codes() {
        assert_eq!(get_status(UserError::AlreadyExists), StatusCode::CONFLICT);
        assert_eq!(
            get_status(UserError::InvalidField { field: "city" }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(get_status(ProductError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(get_status(SyncError::AlreadyRunning), StatusCode::CONFLICT);
        assert_eq!(
            get_status(SyncError::NotConfigured),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(get_status(AuthError::InvalidToken), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(IntegrationError::Api {
                service: "Cloudinary",
                status: 500,
                message: "boom".to_string(),
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(IntegrationError::NotConfigured("Cloudinary")),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_body_is_json_and_hides_internals() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "orders.status = 'shipped'".to_string(),
        ));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }
}
