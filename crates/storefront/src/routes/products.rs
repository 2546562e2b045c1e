//! Product catalogue routes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use balance_botanica_core::ProductId;

use crate::error::Result;
use crate::extract::{AppJson, AppQuery};
use crate::middleware::RequireAdmin;
use crate::models::{NewProduct, Product, ProductUpdate};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
}

/// Active products, optionally in one category.
///
/// GET /api/products?category=
///
/// # Errors
///
/// 500 on storage failure.
pub async fn index(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    Ok(Json(state.products().list(category).await?))
}

/// GET /api/products/{id}
///
/// # Errors
///
/// 404 for unknown or inactive products.
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.products().get(&id, false).await?))
}

/// POST /api/products (admin)
///
/// # Errors
///
/// 400 on invalid fields, 409 if the id is taken.
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppJson(product): AppJson<NewProduct>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.products().create(product).await?;
    tracing::info!(admin = %admin.id, product_id = %product.id, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// PUT /api/products/{id} (admin)
///
/// # Errors
///
/// 400 on invalid fields, 404 for unknown products.
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    AppJson(update): AppJson<ProductUpdate>,
) -> Result<Json<Product>> {
    let product = state.products().update(&id, update).await?;
    tracing::info!(admin = %admin.id, product_id = %product.id, "Product updated");
    Ok(Json(product))
}
