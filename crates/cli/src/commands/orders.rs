//! Order inspection and status changes.
//!
//! Status changes go through `OrderService` as an admin, so the lifecycle
//! rules, the compare-and-set and restocking on cancel all apply. No
//! notification is sent from the CLI.

use sqlx::SqlitePool;

use balance_botanica_core::{OrderId, OrderStatus};
use balance_botanica_storefront::services::orders::{Actor, OrderService};

use super::CommandError;

/// Log every order, optionally only those with `status`.
///
/// # Errors
///
/// Returns `CommandError::Order` on storage failure.
pub async fn list(pool: &SqlitePool, status: Option<OrderStatus>) -> Result<(), CommandError> {
    let orders = OrderService::new(pool.clone(), None, None)
        .list_all(status)
        .await?;

    tracing::info!("{} orders", orders.len());
    for order in &orders {
        tracing::info!(
            "  {}  {:<9}  {}  {}  {}",
            order.id,
            order.status,
            order.created_at.format("%Y-%m-%d %H:%M"),
            order.customer_email,
            order.total
        );
    }
    Ok(())
}

/// Move an order to `status`.
///
/// # Errors
///
/// Returns `CommandError::Order` if the order is missing or the transition
/// is not allowed.
pub async fn set_status(
    pool: &SqlitePool,
    id: &OrderId,
    status: OrderStatus,
) -> Result<(), CommandError> {
    let order = OrderService::new(pool.clone(), None, None)
        .update_status(id, status, Actor::Admin)
        .await?;
    tracing::info!(order_id = %order.id, status = %order.status, "Order updated");
    Ok(())
}
