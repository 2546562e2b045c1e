//! Catalogue reads and admin edits.

use rust_decimal::Decimal;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::instrument;

use balance_botanica_core::{CurrencyCode, Price, PriceError, ProductId};

use crate::db::products::ProductRecord;
use crate::db::{ProductRepository, RepositoryError};
use crate::models::{NewProduct, Product, ProductUpdate};

/// Errors from product operations.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("product not found")]
    NotFound,

    #[error("product already exists")]
    AlreadyExists,

    /// Rejected input, with a client-safe message.
    #[error("{0}")]
    Invalid(String),

    #[error("invalid price: {0}")]
    InvalidPrice(#[from] PriceError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

fn required_text(value: &str, field: &str) -> Result<String, ProductError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ProductError::Invalid(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_owned())
}

fn price_cents(amount: Decimal) -> Result<i64, ProductError> {
    Ok(Price::new(amount, CurrencyCode::UAH).to_cents()?)
}

fn stock(value: i64) -> Result<i64, ProductError> {
    if value < 0 || u32::try_from(value).is_err() {
        return Err(ProductError::Invalid("stock must be a non-negative count".to_owned()));
    }
    Ok(value)
}

/// The validated scalar fields of a [`NewProduct`].
struct CleanProduct {
    id: ProductId,
    name: String,
    category: String,
    description: Option<String>,
    price_cents: i64,
    stock: i64,
}

impl CleanProduct {
    fn from_new(product: &NewProduct) -> Result<Self, ProductError> {
        Ok(Self {
            id: ProductId::new(required_text(product.id.as_str(), "id")?),
            name: required_text(&product.name, "name")?,
            category: required_text(&product.category, "category")?,
            description: product
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_owned),
            price_cents: price_cents(product.price)?,
            stock: stock(product.stock)?,
        })
    }

    fn record<'r>(&'r self, image_urls: &'r [String]) -> ProductRecord<'r> {
        ProductRecord {
            id: &self.id,
            name: &self.name,
            description: self.description.as_deref(),
            category: &self.category,
            price_cents: self.price_cents,
            stock: self.stock,
            image_urls,
            active: true,
        }
    }
}

/// Product service.
#[derive(Clone)]
pub struct ProductService {
    pool: SqlitePool,
}

impl ProductService {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Active products, optionally in one category, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Repository` on storage failure.
    pub async fn list(&self, category: Option<&str>) -> Result<Vec<Product>, ProductError> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        Ok(ProductRepository::new(&self.pool).list_active(category).await?)
    }

    /// A product by id. Inactive products are hidden unless `include_inactive`.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::NotFound` if there is no visible product.
    pub async fn get(&self, id: &ProductId, include_inactive: bool) -> Result<Product, ProductError> {
        ProductRepository::new(&self.pool)
            .get(id)
            .await?
            .filter(|p| p.active || include_inactive)
            .ok_or(ProductError::NotFound)
    }

    /// Add a product to the catalogue.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Invalid` / `InvalidPrice` on bad input and
    /// `ProductError::AlreadyExists` if the id is taken.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn create(&self, product: NewProduct) -> Result<Product, ProductError> {
        let clean = CleanProduct::from_new(&product)?;
        ProductRepository::new(&self.pool)
            .create(&clean.record(&product.image_urls))
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => ProductError::AlreadyExists,
                other => ProductError::Repository(other),
            })
    }

    /// Insert or fully replace a product, reactivating it. Used for seeding.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Invalid` / `InvalidPrice` on bad input.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn upsert(&self, product: NewProduct) -> Result<Product, ProductError> {
        let clean = CleanProduct::from_new(&product)?;
        let repo = ProductRepository::new(&self.pool);
        repo.upsert(&clean.record(&product.image_urls)).await?;
        repo.get(&clean.id).await?.ok_or(ProductError::NotFound)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::NotFound` if the product does not exist and
    /// `ProductError::Invalid` / `InvalidPrice` on bad input.
    #[instrument(skip(self, update))]
    pub async fn update(&self, id: &ProductId, update: ProductUpdate) -> Result<Product, ProductError> {
        let repo = ProductRepository::new(&self.pool);
        let current = repo.get(id).await?.ok_or(ProductError::NotFound)?;

        let name = match update.name.as_deref() {
            Some(n) => required_text(n, "name")?,
            None => current.name,
        };
        let category = match update.category.as_deref() {
            Some(c) => required_text(c, "category")?,
            None => current.category,
        };
        let description = match update.description {
            Some(d) => Some(d.trim().to_owned()).filter(|d| !d.is_empty()),
            None => current.description,
        };
        let price_cents = match update.price {
            Some(amount) => price_cents(amount)?,
            None => current.price.to_cents()?,
        };
        let stock = match update.stock {
            Some(s) => stock(s)?,
            None => i64::from(current.stock),
        };
        let image_urls = update.image_urls.unwrap_or(current.image_urls);

        let record = ProductRecord {
            id,
            name: &name,
            description: description.as_deref(),
            category: &category,
            price_cents,
            stock,
            image_urls: &image_urls,
            active: update.active.unwrap_or(current.active),
        };

        repo.update(&record).await.map_err(|e| match e {
            RepositoryError::NotFound => ProductError::NotFound,
            other => ProductError::Repository(other),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::db::create_memory_pool;

    fn new_product(id: &str, price: &str) -> NewProduct {
        NewProduct {
            id: ProductId::new(id),
            name: "Rose oil".to_owned(),
            description: Some("  ".to_owned()),
            category: "oils".to_owned(),
            price: Decimal::from_str(price).unwrap(),
            stock: 5,
            image_urls: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let products = ProductService::new(create_memory_pool().await.unwrap());

        let negative = products.create(new_product("a", "-1")).await;
        assert!(matches!(negative, Err(ProductError::InvalidPrice(PriceError::Negative))));

        let blank = products
            .create(NewProduct {
                name: " ".to_owned(),
                ..new_product("b", "10")
            })
            .await;
        assert!(matches!(blank, Err(ProductError::Invalid(_))));

        let created = products.create(new_product("rose", "450.50")).await.unwrap();
        assert_eq!(created.price.to_cents().unwrap(), 45_050);
        assert!(created.description.is_none());

        let duplicate = products.create(new_product("rose", "1")).await;
        assert!(matches!(duplicate, Err(ProductError::AlreadyExists)));
    }

    #[tokio::test]
    async fn test_deactivated_product_is_hidden() {
        let products = ProductService::new(create_memory_pool().await.unwrap());
        let id = ProductId::new("rose");
        products.create(new_product("rose", "10")).await.unwrap();

        let updated = products
            .update(
                &id,
                ProductUpdate {
                    active: Some(false),
                    stock: Some(0),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_orderable());
        assert_eq!(updated.name, "Rose oil");

        assert!(matches!(products.get(&id, false).await, Err(ProductError::NotFound)));
        assert!(products.get(&id, true).await.is_ok());
        assert!(products.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let products = ProductService::new(create_memory_pool().await.unwrap());
        let result = products
            .update(&ProductId::new("ghost"), ProductUpdate::default())
            .await;
        assert!(matches!(result, Err(ProductError::NotFound)));
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_reactivates() {
        let products = ProductService::new(create_memory_pool().await.unwrap());
        let id = ProductId::new("rose");
        products.create(new_product("rose", "10")).await.unwrap();
        products
            .update(
                &id,
                ProductUpdate {
                    active: Some(false),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();

        let seeded = products.upsert(new_product("rose", "12.50")).await.unwrap();
        assert!(seeded.active);
        assert_eq!(seeded.price.to_cents().unwrap(), 1250);
        assert_eq!(products.list(None).await.unwrap().len(), 1);
    }
}
