//! Order placement and lifecycle.
//!
//! Prices always come from the catalogue, never from the client. Stock is
//! taken in the same transaction that inserts the order, through a guarded
//! update that refuses to go below zero, and is put back when an order is
//! cancelled. Status changes are a compare-and-set on the previous status,
//! so two concurrent changes cannot both win.

mod error;

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::instrument;

pub use error::OrderError;

use balance_botanica_core::{OrderId, OrderStatus, PhoneNumber, Price, ProductId, UserId};

use super::ports::{OrderEvent, OrderEventKind, OrderNotifier, OrderSheet, SheetRow};
use crate::db::orders::{self as order_rows, OrderRecord};
use crate::db::products::{return_stock, take_stock};
use crate::db::{OrderRepository, ProductRepository, RepositoryError};
use crate::models::{DeliveryDetails, Order, OrderItem, User};

/// Most units of one product per order.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Longest accepted order note.
pub const MAX_NOTES_LENGTH: usize = 1000;

const MAX_ID_ATTEMPTS: usize = 10;

/// One basket line as sent by the client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// A priced basket.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub lines: Vec<OrderItem>,
    pub total: Price,
    pub item_count: u32,
}

/// Delivery details as sent by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryInput {
    pub recipient: String,
    pub phone: String,
    pub city: String,
    pub address: String,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Request to place an order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub items: Vec<CartLine>,
    pub delivery: DeliveryInput,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Who is asking for a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// A signed-in customer; may only cancel their own pending orders.
    Customer(UserId),
    /// Shop staff; may make any allowed transition.
    Admin,
}

fn required(value: &str, field: &str) -> Result<String, OrderError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 200 {
        return Err(OrderError::InvalidDelivery(format!(
            "{field} must be 1-200 characters"
        )));
    }
    Ok(trimmed.to_owned())
}

impl DeliveryInput {
    fn validate(&self) -> Result<DeliveryDetails, OrderError> {
        Ok(DeliveryDetails {
            recipient: required(&self.recipient, "recipient")?,
            phone: PhoneNumber::parse(&self.phone)?,
            city: required(&self.city, "city")?,
            address: required(&self.address, "address")?,
            postal_code: self
                .postal_code
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned),
        })
    }
}

fn clean_notes(notes: Option<&str>) -> Result<Option<String>, OrderError> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if notes.chars().count() > MAX_NOTES_LENGTH {
        return Err(OrderError::InvalidDelivery(format!(
            "notes must be at most {MAX_NOTES_LENGTH} characters"
        )));
    }
    Ok(Some(notes.to_owned()))
}

/// Merge duplicate lines and check quantities.
fn merge_lines(lines: &[CartLine]) -> Result<BTreeMap<ProductId, u32>, OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyOrder);
    }

    let mut merged: BTreeMap<ProductId, i64> = BTreeMap::new();
    for line in lines {
        if !(1..=MAX_LINE_QUANTITY).contains(&line.quantity) {
            return Err(OrderError::InvalidQuantity(line.product_id.clone()));
        }
        let total = merged.entry(line.product_id.clone()).or_insert(0);
        *total = total
            .checked_add(line.quantity)
            .ok_or_else(|| OrderError::InvalidQuantity(line.product_id.clone()))?;
    }

    merged
        .into_iter()
        .map(|(id, quantity)| {
            if quantity > MAX_LINE_QUANTITY {
                return Err(OrderError::InvalidQuantity(id));
            }
            let quantity =
                u32::try_from(quantity).map_err(|_| OrderError::InvalidQuantity(id.clone()))?;
            Ok((id, quantity))
        })
        .collect()
}

/// A random six-digit order number.
fn random_order_id() -> OrderId {
    OrderId::new(rand::rng().random_range(100_000..1_000_000_u32).to_string())
}

/// Order service.
#[derive(Clone)]
pub struct OrderService {
    pool: SqlitePool,
    notifier: Option<Arc<dyn OrderNotifier>>,
    sheet: Option<Arc<dyn OrderSheet>>,
}

impl OrderService {
    #[must_use]
    pub fn new(
        pool: SqlitePool,
        notifier: Option<Arc<dyn OrderNotifier>>,
        sheet: Option<Arc<dyn OrderSheet>>,
    ) -> Self {
        Self {
            pool,
            notifier,
            sheet,
        }
    }

    /// Price a basket at current catalogue prices.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyOrder` / `InvalidQuantity` for malformed
    /// baskets, `ProductNotFound` for unknown or inactive products and
    /// `InsufficientStock` when a line asks for more than is left.
    pub async fn quote(&self, lines: &[CartLine]) -> Result<Quote, OrderError> {
        let merged = merge_lines(lines)?;
        let products = ProductRepository::new(&self.pool);

        let mut priced = Vec::with_capacity(merged.len());
        for (id, quantity) in merged {
            let product = products
                .get(&id)
                .await?
                .filter(|p| p.active)
                .ok_or_else(|| OrderError::ProductNotFound(id.clone()))?;
            if product.stock < quantity {
                return Err(OrderError::InsufficientStock(id));
            }

            priced.push(OrderItem {
                product_id: product.id,
                product_name: product.name,
                quantity,
                unit_price: product.price,
                line_total: product.price.times(quantity),
            });
        }

        Ok(Quote {
            total: priced.iter().map(|line| line.line_total).sum(),
            item_count: priced.iter().map(|line| line.quantity).sum(),
            lines: priced,
        })
    }

    /// Place an order for `user`.
    ///
    /// # Errors
    ///
    /// Returns the [`quote`](Self::quote) errors, `InvalidDelivery` /
    /// `InvalidPhone` for bad delivery details, and `InsufficientStock` if
    /// stock ran out between quoting and placing (nothing is written then).
    #[instrument(skip(self, user, order), fields(user_id = %user.id))]
    pub async fn create(&self, user: &User, order: NewOrder) -> Result<Order, OrderError> {
        let delivery = order.delivery.validate()?;
        let notes = clean_notes(order.notes.as_deref())?;
        let quote = self.quote(&order.items).await?;
        let total_cents = quote.total.to_cents()?;

        let mut placed = None;
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = random_order_id();
            let mut tx = self.pool.begin().await?;

            let record = OrderRecord {
                id: &id,
                user_id: &user.id,
                total_cents,
                customer_email: &user.email,
                delivery: &delivery,
                notes: notes.as_deref(),
            };
            match order_rows::insert_order(&mut tx, &record).await {
                Ok(()) => {}
                Err(RepositoryError::Conflict(_)) => {
                    tracing::debug!(order_id = %id, "Order number taken, retrying");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            for line in &quote.lines {
                if !take_stock(&mut tx, &line.product_id, line.quantity).await? {
                    return Err(OrderError::InsufficientStock(line.product_id.clone()));
                }
                let unit_cents = line.unit_price.to_cents()?;
                order_rows::insert_item(&mut tx, &id, line, unit_cents).await?;
            }

            tx.commit().await?;
            placed = Some(id);
            break;
        }
        let id = placed.ok_or(OrderError::IdExhausted)?;

        let order = OrderRepository::new(&self.pool)
            .get(&id)
            .await?
            .ok_or(OrderError::NotFound)?;
        tracing::info!(order_id = %order.id, total = %order.total, "Order placed");

        self.publish(OrderEventKind::Placed, &order).await;
        Ok(order)
    }

    /// An order, if `user_id` placed it.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` or `OrderError::AccessDenied`.
    pub async fn get_for_user(&self, order_id: &OrderId, user_id: &UserId) -> Result<Order, OrderError> {
        let order = self.get(order_id).await?;
        if !order.is_owned_by(user_id) {
            return Err(OrderError::AccessDenied);
        }
        Ok(order)
    }

    /// Any order (admin).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if it does not exist.
    pub async fn get(&self, order_id: &OrderId) -> Result<Order, OrderError> {
        OrderRepository::new(&self.pool)
            .get(order_id)
            .await?
            .ok_or(OrderError::NotFound)
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` on storage failure.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, OrderError> {
        Ok(OrderRepository::new(&self.pool).list_for_user(user_id).await?)
    }

    /// All orders, optionally with one status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` on storage failure.
    pub async fn list_all(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, OrderError> {
        Ok(OrderRepository::new(&self.pool).list_all(status).await?)
    }

    /// Move an order to `target`.
    ///
    /// Customers must own the order and may only cancel it while it is
    /// pending. Admins may make any transition [`OrderStatus`] allows.
    /// Cancelling returns the items to stock.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `AccessDenied` for someone else's order or a
    /// customer asking for anything but a cancel, `InvalidTransition` when
    /// the lifecycle forbids the change, and `Conflict` when another request
    /// changed the status first.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: &OrderId,
        target: OrderStatus,
        actor: Actor,
    ) -> Result<Order, OrderError> {
        let order = self.get(order_id).await?;
        let from = order.status;

        if let Actor::Customer(user_id) = &actor {
            if !order.is_owned_by(user_id) {
                return Err(OrderError::AccessDenied);
            }
            if target != OrderStatus::Cancelled {
                return Err(OrderError::AccessDenied);
            }
            if from != OrderStatus::Pending {
                return Err(OrderError::InvalidTransition { from, to: target });
            }
        }
        if !from.can_transition_to(target) {
            return Err(OrderError::InvalidTransition { from, to: target });
        }

        let mut tx = self.pool.begin().await?;
        if !order_rows::compare_and_set_status(&mut tx, order_id, from, target).await? {
            return Err(OrderError::Conflict);
        }
        if target == OrderStatus::Cancelled {
            for item in &order.items {
                return_stock(&mut tx, &item.product_id, item.quantity).await?;
            }
        }
        tx.commit().await?;

        let updated = self.get(order_id).await?;
        tracing::info!(order_id = %order_id, %from, to = %target, "Order status changed");

        self.publish(OrderEventKind::StatusChanged { from }, &updated).await;
        Ok(updated)
    }

    /// Cancel a customer's own pending order.
    ///
    /// # Errors
    ///
    /// Same as [`update_status`](Self::update_status).
    pub async fn cancel(&self, order_id: &OrderId, user_id: &UserId) -> Result<Order, OrderError> {
        self.update_status(order_id, OrderStatus::Cancelled, Actor::Customer(user_id.clone()))
            .await
    }

    /// Tell the shop and the spreadsheet. Failures are logged, never returned:
    /// the order is already committed.
    async fn publish(&self, kind: OrderEventKind, order: &Order) {
        if let Some(notifier) = &self.notifier {
            let event = OrderEvent {
                kind,
                order: order.clone(),
            };
            if let Err(e) = notifier.notify(&event).await {
                tracing::warn!(order_id = %order.id, error = %e, "Order notification failed");
            }
        }
        if let Some(sheet) = &self.sheet
            && let Err(e) = sheet.upsert_rows(&[SheetRow::from(order)]).await
        {
            tracing::warn!(order_id = %order.id, error = %e, "Spreadsheet update failed");
        }
    }
}
