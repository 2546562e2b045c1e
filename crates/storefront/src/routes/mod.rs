//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (database)
//!
//! # Auth (rate limited)
//! POST /api/auth/callback              - Supabase access token -> session cookie
//! POST /api/auth/logout                - End session, clear cookie
//!
//! # User (requires auth)
//! GET  /api/user/session-check         - Signed in? (works anonymously)
//! GET  /api/user/profile               - Current user
//! PUT  /api/user/profile               - Update names / phone
//! GET  /api/user/addresses             - Saved delivery addresses
//! POST /api/user/addresses             - Save an address
//! DEL  /api/user/addresses/{id}        - Delete an address
//!
//! # Catalogue
//! GET  /api/products?category=         - Active products
//! GET  /api/products/{id}              - One product
//! POST /api/products                   - Create (admin)
//! PUT  /api/products/{id}              - Update (admin)
//! POST /api/cart/quote                 - Price a basket
//!
//! # Orders
//! GET  /api/orders                     - Own orders
//! POST /api/orders                     - Place an order
//! GET  /api/orders/{id}                - One own order
//! POST /api/orders/{id}/cancel         - Cancel a pending order
//! PUT  /api/orders/{id}/status         - Set status (admin)
//! GET  /api/orders/sync                - Last spreadsheet sync (admin)
//! POST /api/orders/sync                - Start a full sync (admin)
//! GET  /api/admin/orders?status=       - All orders (admin)
//!
//! # Images (admin)
//! GET  /api/cloudinary/signature       - Signed direct-upload parameters
//! POST /api/cloudinary/upload          - Multipart upload
//! POST /api/cloudinary/delete          - Delete by public id
//! ```

pub mod auth;
pub mod cart;
pub mod cloudinary;
pub mod health;
pub mod orders;
pub mod products;
pub mod user;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// `trust_proxy_headers` selects how the rate limiter finds the client
/// address (see [`crate::middleware::rate_limit`]).
pub fn auth_routes(trust_proxy_headers: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/callback", post(auth::callback))
        .route("/logout", post(auth::logout));

    match auth_rate_limiter(trust_proxy_headers) {
        Some(limiter) => router.layer(limiter),
        None => {
            tracing::error!("Auth rate limiter could not be built; serving without it");
            router
        }
    }
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/session-check", get(user::session_check))
        .route("/profile", get(user::profile).put(user::update_profile))
        .route(
            "/addresses",
            get(user::addresses).post(user::create_address),
        )
        .route("/addresses/{id}", delete(user::delete_address))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/{id}", get(products::show).put(products::update))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/sync", get(orders::sync_status).post(orders::start_sync))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
        .route("/{id}/status", put(orders::update_status))
}

/// Create the image routes router.
pub fn cloudinary_routes() -> Router<AppState> {
    Router::new()
        .route("/signature", get(cloudinary::signature))
        .route(
            "/upload",
            post(cloudinary::upload).layer(DefaultBodyLimit::max(cloudinary::MAX_UPLOAD_BYTES)),
        )
        .route("/delete", post(cloudinary::delete))
}

/// Create all routes for the storefront.
pub fn routes(trust_proxy_headers: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth_routes(trust_proxy_headers))
        .nest("/api/user", user_routes())
        .nest("/api/products", product_routes())
        .route("/api/cart/quote", post(cart::quote))
        .nest("/api/orders", order_routes())
        .route("/api/admin/orders", get(orders::admin_index))
        .nest("/api/cloudinary", cloudinary_routes())
}
