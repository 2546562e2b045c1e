//! Seed the catalogue from a YAML file.
//!
//! The file is a list of products. Prices are strings so they stay exact:
//!
//! ```yaml
//! - id: rose-oil-30
//!   name: Rose oil 30 ml
//!   category: oils
//!   price: "450.00"
//!   stock: 12
//!   image_urls:
//!     - https://res.cloudinary.com/demo/image/upload/rose.jpg
//! ```
//!
//! Existing products with the same id are replaced and reactivated.

use std::path::Path;

use sqlx::SqlitePool;

use super::CommandError;
use balance_botanica_storefront::models::NewProduct;
use balance_botanica_storefront::services::products::ProductService;

/// Parse a catalogue file's contents.
///
/// # Errors
///
/// Returns `CommandError::Yaml` if the document is not a product list.
pub fn parse_catalogue(content: &str) -> Result<Vec<NewProduct>, CommandError> {
    Ok(serde_yaml::from_str(content)?)
}

/// Insert or replace every product in `file_path`.
///
/// Validation stops at the first bad product; earlier ones stay written.
///
/// # Errors
///
/// Returns `CommandError` if the file cannot be read or parsed, or a
/// product is rejected.
pub async fn products(pool: &SqlitePool, file_path: &str) -> Result<(), CommandError> {
    let path = Path::new(file_path);
    tracing::info!(path = %file_path, "Loading products from file");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: file_path.to_owned(),
            source,
        })?;
    let catalogue = parse_catalogue(&content)?;
    tracing::info!(products = catalogue.len(), "Parsed catalogue");

    let service = ProductService::new(pool.clone());
    for product in catalogue {
        let id = product.id.to_string();
        let saved = service
            .upsert(product)
            .await
            .map_err(|source| CommandError::Product { id, source })?;
        tracing::info!(product_id = %saved.id, stock = saved.stock, "Seeded product");
    }

    tracing::info!("Seeding complete");
    Ok(())
}
