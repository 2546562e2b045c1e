//! Seams to the external collaborators.
//!
//! Each integration is a thin black box: one HTTP call, no retries. Services
//! hold them as `Arc<dyn Trait>` so tests can swap in recording fakes.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use balance_botanica_core::{Email, OrderId, OrderStatus, Price, UserId};

use crate::models::Order;

/// Errors from any external integration.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{service} API error: {status} - {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// The service rejected our credentials or the caller's token.
    #[error("{0} rejected the credentials")]
    Unauthorized(&'static str),

    /// The integration has no configuration.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Identity as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Resolves a browser-supplied access token to an identity.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `IntegrationError::Unauthorized` for an invalid or expired
    /// token, other variants when the provider cannot be reached.
    async fn user_for_token(&self, access_token: &str) -> Result<Identity, IntegrationError>;
}

/// What happened to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEventKind {
    Placed,
    StatusChanged { from: OrderStatus },
}

/// An order change worth telling the shop about.
#[derive(Debug, Clone)]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub order: Order,
}

/// Pushes order events to whoever runs the shop.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// # Errors
    ///
    /// Returns `IntegrationError` if the message could not be delivered.
    async fn notify(&self, event: &OrderEvent) -> Result<(), IntegrationError>;
}

/// One order flattened for the spreadsheet.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SheetRow {
    pub order_id: OrderId,
    pub created_at: String,
    pub status: OrderStatus,
    pub customer_email: Email,
    pub recipient: String,
    pub phone: String,
    pub city: String,
    pub address: String,
    /// `name x qty` lines joined with `; `.
    pub items: String,
    pub total: String,
}

impl From<&Order> for SheetRow {
    fn from(order: &Order) -> Self {
        let items = order
            .items
            .iter()
            .map(|item| format!("{} x{}", item.product_name, item.quantity))
            .collect::<Vec<_>>()
            .join("; ");

        Self {
            order_id: order.id.clone(),
            created_at: order.created_at.to_rfc3339(),
            status: order.status,
            customer_email: order.customer_email.clone(),
            recipient: order.delivery.recipient.clone(),
            phone: order.delivery.phone.to_string(),
            city: order.delivery.city.clone(),
            address: order.delivery.address.clone(),
            items,
            total: format_amount(order.total),
        }
    }
}

fn format_amount(price: Price) -> String {
    format!("{:.2}", price.amount)
}

/// Receives order rows, keyed by order id (insert or replace).
#[async_trait]
pub trait OrderSheet: Send + Sync {
    /// # Errors
    ///
    /// Returns `IntegrationError` if the rows were not accepted.
    async fn upsert_rows(&self, rows: &[SheetRow]) -> Result<(), IntegrationError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use balance_botanica_core::{PhoneNumber, ProductId};

    use super::*;
    use crate::models::{DeliveryDetails, OrderItem};

    #[test]
    fn test_sheet_row_flattens_items() {
        let unit = Price::from_cents(12_000);
        let order = Order {
            id: OrderId::new("806039"),
            user_id: UserId::new("u1"),
            status: OrderStatus::Pending,
            total: Price::from_cents(27_999),
            customer_email: Email::parse("u1@example.com").unwrap(),
            delivery: DeliveryDetails {
                recipient: "Olena K".to_owned(),
                phone: PhoneNumber::parse("0501234567").unwrap(),
                city: "Lviv".to_owned(),
                address: "Nova Poshta #3".to_owned(),
                postal_code: None,
            },
            notes: None,
            items: vec![
                OrderItem {
                    product_id: ProductId::new("calm-tea"),
                    product_name: "Calm tea".to_owned(),
                    quantity: 2,
                    unit_price: unit,
                    line_total: unit.times(2),
                },
                OrderItem {
                    product_id: ProductId::new("rose-oil"),
                    product_name: "Rose oil".to_owned(),
                    quantity: 1,
                    unit_price: Price::from_cents(3_999),
                    line_total: Price::from_cents(3_999),
                },
            ],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let row = SheetRow::from(&order);
        assert_eq!(row.items, "Calm tea x2; Rose oil x1");
        assert_eq!(row.total, "279.99");
        assert_eq!(row.phone, "0501234567");
    }
}
