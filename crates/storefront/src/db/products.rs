//! Product repository.

use sqlx::{SqliteConnection, SqlitePool};

use balance_botanica_core::{Price, ProductId};

use super::{RepositoryError, from_millis, now_millis};
use crate::models::Product;

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    description: Option<String>,
    category: String,
    price_cents: i64,
    stock: i64,
    image_urls: String,
    active: bool,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let stock = u32::try_from(row.stock).map_err(|_| {
            RepositoryError::DataCorruption(format!("invalid stock for {}: {}", row.id, row.stock))
        })?;
        let image_urls: Vec<String> = serde_json::from_str(&row.image_urls).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid image_urls for {}: {e}", row.id))
        })?;

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            description: row.description,
            category: row.category,
            price: Price::from_cents(row.price_cents),
            stock,
            image_urls,
            active: row.active,
            created_at: from_millis(row.created_at)?,
            updated_at: from_millis(row.updated_at)?,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, name, description, category, price_cents, stock, \
                               image_urls, active, created_at, updated_at";

/// Column values for an insert or a full overwrite.
#[derive(Debug, Clone)]
pub struct ProductRecord<'r> {
    pub id: &'r ProductId,
    pub name: &'r str,
    pub description: Option<&'r str>,
    pub category: &'r str,
    pub price_cents: i64,
    pub stock: i64,
    pub image_urls: &'r [String],
    pub active: bool,
}

fn encode_image_urls(urls: &[String]) -> Result<String, RepositoryError> {
    serde_json::to_string(urls)
        .map_err(|e| RepositoryError::DataCorruption(format!("cannot encode image_urls: {e}")))
}

/// Repository for catalogue products.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Active products, optionally filtered by category, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list_active(&self, category: Option<&str>) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE active = 1 AND (?1 IS NULL OR category = ?1) \
             ORDER BY name COLLATE NOCASE"
        ))
        .bind(category)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Get a product by id, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
                .bind(id.as_str())
                .fetch_optional(self.pool)
                .await?;

        row.map(Product::try_from).transpose()
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the id already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, record: &ProductRecord<'_>) -> Result<Product, RepositoryError> {
        let now = now_millis();
        let row: ProductRow = sqlx::query_as(&format!(
            "INSERT INTO products \
             (id, name, description, category, price_cents, stock, image_urls, active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(record.id.as_str())
        .bind(record.name)
        .bind(record.description)
        .bind(record.category)
        .bind(record.price_cents)
        .bind(record.stock)
        .bind(encode_image_urls(record.image_urls)?)
        .bind(record.active)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "product"))?;

        Product::try_from(row)
    }

    /// Overwrite every column of an existing product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(&self, record: &ProductRecord<'_>) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "UPDATE products SET name = ?, description = ?, category = ?, price_cents = ?, \
             stock = ?, image_urls = ?, active = ?, updated_at = ? \
             WHERE id = ? \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(record.name)
        .bind(record.description)
        .bind(record.category)
        .bind(record.price_cents)
        .bind(record.stock)
        .bind(encode_image_urls(record.image_urls)?)
        .bind(record.active)
        .bind(now_millis())
        .bind(record.id.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Insert a product or overwrite it if the id exists. Used by seeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, record: &ProductRecord<'_>) -> Result<(), RepositoryError> {
        let now = now_millis();
        sqlx::query(
            "INSERT INTO products \
             (id, name, description, category, price_cents, stock, image_urls, active, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (id) DO UPDATE SET \
             name = excluded.name, description = excluded.description, \
             category = excluded.category, price_cents = excluded.price_cents, \
             stock = excluded.stock, image_urls = excluded.image_urls, \
             active = excluded.active, updated_at = excluded.updated_at",
        )
        .bind(record.id.as_str())
        .bind(record.name)
        .bind(record.description)
        .bind(record.category)
        .bind(record.price_cents)
        .bind(record.stock)
        .bind(encode_image_urls(record.image_urls)?)
        .bind(record.active)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}

/// Take `quantity` units out of stock.
///
/// Returns `false` without changing anything when the product is inactive or
/// has fewer than `quantity` units left.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn take_stock(
    conn: &mut SqliteConnection,
    id: &ProductId,
    quantity: u32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "UPDATE products SET stock = stock - ?1, updated_at = ?2 \
         WHERE id = ?3 AND active = 1 AND stock >= ?1",
    )
    .bind(i64::from(quantity))
    .bind(now_millis())
    .bind(id.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Put `quantity` units back into stock.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn return_stock(
    conn: &mut SqliteConnection,
    id: &ProductId,
    quantity: u32,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE products SET stock = stock + ?, updated_at = ? WHERE id = ?")
        .bind(i64::from(quantity))
        .bind(now_millis())
        .bind(id.as_str())
        .execute(conn)
        .await?;
    Ok(())
}
