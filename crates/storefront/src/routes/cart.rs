//! Basket pricing.
//!
//! The basket itself lives in the browser; this prices it against the
//! catalogue so the client never decides what anything costs.

use axum::{Json, extract::State};
use serde::Deserialize;

use crate::error::Result;
use crate::extract::AppJson;
use crate::services::orders::{CartLine, Quote};
use crate::state::AppState;

/// Body of `POST /api/cart/quote`.
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub items: Vec<CartLine>,
}

/// Price a basket.
///
/// POST /api/cart/quote
///
/// # Errors
///
/// 400 for an empty basket or bad quantity, 404 for an unknown product.
pub async fn quote(
    State(state): State<AppState>,
    AppJson(req): AppJson<QuoteRequest>,
) -> Result<Json<Quote>> {
    Ok(Json(state.orders().quote(&req.items).await?))
}
