//! Order repository.
//!
//! Reads go through [`OrderRepository`]. Writes that must be atomic with
//! stock changes are free functions over a `SqliteConnection`, so the order
//! service can run them inside one transaction.

use sqlx::{SqliteConnection, SqlitePool};

use balance_botanica_core::{
    Email, OrderId, OrderStatus, PhoneNumber, Price, ProductId, UserId,
};

use super::{RepositoryError, from_millis, now_millis};
use crate::models::{DeliveryDetails, Order, OrderItem};

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: String,
    status: String,
    total_cents: i64,
    customer_email: String,
    delivery_recipient: String,
    delivery_phone: String,
    delivery_city: String,
    delivery_address: String,
    delivery_postal_code: Option<String>,
    notes: Option<String>,
    created_at: i64,
    updated_at: i64,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price_cents: i64,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid quantity: {}", row.quantity))
        })?;
        let unit_price = Price::from_cents(row.unit_price_cents);

        Ok(Self {
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            quantity,
            unit_price,
            line_total: unit_price.times(quantity),
        })
    }
}

fn into_order(row: OrderRow, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
    let status: OrderStatus = row.status.parse().map_err(|e| {
        RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
    })?;
    let customer_email = Email::parse(&row.customer_email).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid email in order {}: {e}", row.id))
    })?;
    let phone = PhoneNumber::parse(&row.delivery_phone).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid phone in order {}: {e}", row.id))
    })?;

    Ok(Order {
        id: OrderId::new(row.id),
        user_id: UserId::new(row.user_id),
        status,
        total: Price::from_cents(row.total_cents),
        customer_email,
        delivery: DeliveryDetails {
            recipient: row.delivery_recipient,
            phone,
            city: row.delivery_city,
            address: row.delivery_address,
            postal_code: row.delivery_postal_code,
        },
        notes: row.notes,
        items,
        created_at: from_millis(row.created_at)?,
        updated_at: from_millis(row.updated_at)?,
    })
}

const ORDER_COLUMNS: &str = "id, user_id, status, total_cents, customer_email, \
                             delivery_recipient, delivery_phone, delivery_city, \
                             delivery_address, delivery_postal_code, notes, \
                             created_at, updated_at";

/// Repository for reading orders.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get an order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        load(&mut conn, id).await
    }

    /// A user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_str())
        .fetch_all(self.pool)
        .await?;

        self.all_with_items(rows).await
    }

    /// All orders, optionally with one status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list_all(&self, status: Option<OrderStatus>) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE (?1 IS NULL OR status = ?1) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(status.map(OrderStatus::as_str))
        .fetch_all(self.pool)
        .await?;

        self.all_with_items(rows).await
    }

    /// One page of all orders, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn page_oldest_first(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at, id LIMIT ? OFFSET ?"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        self.all_with_items(rows).await
    }

    async fn all_with_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.with_items(row).await?);
        }
        Ok(orders)
    }

    async fn with_items(&self, row: OrderRow) -> Result<Order, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let items = items_for(&mut conn, &row.id).await?;
        into_order(row, items)
    }
}

/// Read an order with its items on an existing connection.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
/// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
pub async fn load(
    conn: &mut SqliteConnection,
    id: &OrderId,
) -> Result<Option<Order>, RepositoryError> {
    let row: Option<OrderRow> =
        sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&mut *conn)
            .await?;

    match row {
        Some(row) => {
            let items = items_for(conn, &row.id).await?;
            into_order(row, items).map(Some)
        }
        None => Ok(None),
    }
}

/// Column values for a new order row.
#[derive(Debug, Clone)]
pub struct OrderRecord<'r> {
    pub id: &'r OrderId,
    pub user_id: &'r UserId,
    pub total_cents: i64,
    pub customer_email: &'r Email,
    pub delivery: &'r DeliveryDetails,
    pub notes: Option<&'r str>,
}

/// Insert a `pending` order row.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order id is taken.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert_order(
    conn: &mut SqliteConnection,
    record: &OrderRecord<'_>,
) -> Result<(), RepositoryError> {
    let now = now_millis();
    sqlx::query(
        "INSERT INTO orders \
         (id, user_id, status, total_cents, customer_email, delivery_recipient, delivery_phone, \
          delivery_city, delivery_address, delivery_postal_code, notes, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.id.as_str())
    .bind(record.user_id.as_str())
    .bind(OrderStatus::Pending.as_str())
    .bind(record.total_cents)
    .bind(record.customer_email.as_str())
    .bind(&record.delivery.recipient)
    .bind(record.delivery.phone.as_str())
    .bind(&record.delivery.city)
    .bind(&record.delivery.address)
    .bind(record.delivery.postal_code.as_deref())
    .bind(record.notes)
    .bind(now)
    .bind(now)
    .execute(conn)
    .await
    .map_err(|e| RepositoryError::unique_violation(e, "order id"))?;
    Ok(())
}

/// Insert one line of an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_item(
    conn: &mut SqliteConnection,
    order_id: &OrderId,
    item: &OrderItem,
    unit_price_cents: i64,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price_cents) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(order_id.as_str())
    .bind(item.product_id.as_str())
    .bind(&item.product_name)
    .bind(i64::from(item.quantity))
    .bind(unit_price_cents)
    .execute(conn)
    .await?;
    Ok(())
}

/// Lines of an order, in product id order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items_for(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> Result<Vec<OrderItem>, RepositoryError> {
    let rows: Vec<OrderItemRow> = sqlx::query_as(
        "SELECT product_id, product_name, quantity, unit_price_cents \
         FROM order_items WHERE order_id = ? ORDER BY product_id",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(OrderItem::try_from).collect()
}

/// Move an order from `from` to `to` if it is still in `from`.
///
/// Returns `false` when the stored status is no longer `from`, meaning
/// another request changed the order first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn compare_and_set_status(
    conn: &mut SqliteConnection,
    id: &OrderId,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
        .bind(to.as_str())
        .bind(now_millis())
        .bind(id.as_str())
        .bind(from.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() == 1)
}
