//! Catalogue products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use balance_botanica_core::{Price, ProductId};

/// A catalogue product.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: Price,
    /// Units available to order.
    pub stock: u32,
    pub image_urls: Vec<String>,
    /// Inactive products are hidden from the catalogue and cannot be ordered.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product can currently be added to an order.
    #[must_use]
    pub const fn is_orderable(&self) -> bool {
        self.active && self.stock > 0
    }
}

/// Admin request body for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    /// Catalogue slug, e.g. `lavender-oil-10ml`.
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: String,
    /// Price in UAH.
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

/// Admin partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub price: Option<Decimal>,
    pub stock: Option<i64>,
    pub image_urls: Option<Vec<String>>,
    pub active: Option<bool>,
}
