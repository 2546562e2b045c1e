//! Orders and their line items.

use chrono::{DateTime, Utc};
use serde::Serialize;

use balance_botanica_core::{Email, OrderId, OrderStatus, PhoneNumber, Price, ProductId, UserId};

/// Delivery contact copied onto the order when it is placed.
///
/// Copied rather than referenced so that editing or deleting a saved
/// address never changes an existing order.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryDetails {
    pub recipient: String,
    pub phone: PhoneNumber,
    pub city: String,
    pub address: String,
    pub postal_code: Option<String>,
}

/// A line of an order, priced at the time the order was placed.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Price,
    pub line_total: Price,
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Price,
    pub customer_email: Email,
    pub delivery: DeliveryDetails,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether `user_id` placed this order.
    #[must_use]
    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}
