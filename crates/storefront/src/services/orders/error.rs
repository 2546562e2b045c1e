//! Order error types.

use thiserror::Error;

use balance_botanica_core::{OrderStatus, PhoneError, PriceError, ProductId};

use crate::db::RepositoryError;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The basket has no lines.
    #[error("order has no items")]
    EmptyOrder,

    /// A line has a zero, negative or absurd quantity.
    #[error("invalid quantity for {0}")]
    InvalidQuantity(ProductId),

    /// The product does not exist or is not for sale.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Not enough units left.
    #[error("not enough stock for {0}")]
    InsufficientStock(ProductId),

    /// Delivery details are incomplete or malformed.
    #[error("{0}")]
    InvalidDelivery(String),

    #[error("invalid phone: {0}")]
    InvalidPhone(#[from] PhoneError),

    /// No such order.
    #[error("order not found")]
    NotFound,

    /// The order belongs to someone else, or the caller may not make this change.
    #[error("access denied")]
    AccessDenied,

    /// The status change is not allowed from the current status.
    #[error("cannot change order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Another request changed the order first.
    #[error("order was modified concurrently")]
    Conflict,

    /// Could not find a free order number.
    #[error("could not allocate an order number")]
    IdExhausted,

    #[error("invalid price: {0}")]
    Price(#[from] PriceError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}
