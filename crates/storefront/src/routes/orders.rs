//! Order routes for customers and shop staff.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use balance_botanica_core::{OrderId, OrderStatus};

use crate::error::Result;
use crate::extract::{AppJson, AppQuery};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::Order;
use crate::services::orders::{Actor, NewOrder};
use crate::services::sync::SyncStatus;
use crate::state::AppState;

/// GET /api/orders
///
/// # Errors
///
/// 500 on storage failure.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list_for_user(&user.id).await?))
}

/// Place an order.
///
/// POST /api/orders
///
/// # Errors
///
/// 400 on bad input, 404 for unknown products, 409 when stock ran out.
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    AppJson(order): AppJson<NewOrder>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state.orders().create(&user, order).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/orders/{id}
///
/// # Errors
///
/// 404 for unknown orders, 403 for someone else's.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().get_for_user(&id, &user.id).await?))
}

/// Cancel one of the caller's pending orders.
///
/// POST /api/orders/{id}/cancel
///
/// # Errors
///
/// 403 for someone else's order, 409 once it is past `pending`.
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    Ok(Json(state.orders().cancel(&id, &user.id).await?))
}

/// Body of `PUT /api/orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// Move an order along its lifecycle (admin).
///
/// PUT /api/orders/{id}/status
///
/// # Errors
///
/// 404 for unknown orders, 409 for a disallowed or lost transition.
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<OrderId>,
    AppJson(update): AppJson<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .update_status(&id, update.status, Actor::Admin)
        .await?;
    tracing::info!(admin = %admin.id, order_id = %order.id, status = %order.status, "Order status set");
    Ok(Json(order))
}

/// Query parameters for the admin order listing.
#[derive(Debug, Default, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<OrderStatus>,
}

/// GET /api/admin/orders?status=
///
/// # Errors
///
/// 500 on storage failure.
pub async fn admin_index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    AppQuery(query): AppQuery<AdminOrderQuery>,
) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders().list_all(query.status).await?))
}

/// Acknowledgement for a started sync.
#[derive(Debug, Serialize)]
pub struct SyncStarted {
    pub started: bool,
}

/// Start a full spreadsheet sync in the background.
///
/// POST /api/orders/sync
///
/// # Errors
///
/// 409 while a sync is running, 503 when no spreadsheet is configured.
pub async fn start_sync(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<(StatusCode, Json<SyncStarted>)> {
    // The task reports through `last_report`; nobody awaits the handle.
    let _task = state.sync().trigger_full_sync()?;
    tracing::info!(admin = %admin.id, "Full order sync started");
    Ok((StatusCode::ACCEPTED, Json(SyncStarted { started: true })))
}

/// GET /api/orders/sync
pub async fn sync_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Json<SyncStatus> {
    Json(state.sync().status())
}
