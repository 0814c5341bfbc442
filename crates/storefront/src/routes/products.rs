//! Product route handlers.
//!
//! Public, read-only views of the embedded catalog. Every product passes
//! through [`catalog::sanitize`] before serialization.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use crate::catalog;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// GET /api/products
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    let products: Vec<Value> = state.catalog().all().iter().map(catalog::sanitize).collect();
    Json(json!({ "products": products }))
}

/// GET /api/products/{slug}
///
/// # Errors
///
/// 404 if no product has this slug.
pub async fn show(State(state): State<AppState>, Path(slug): Path<String>) -> Result<Json<Value>> {
    let product = state
        .catalog()
        .by_slug(&slug)
        .ok_or_else(|| AppError::NotFound("Product not found.".to_string()))?;
    Ok(Json(json!({ "product": catalog::sanitize(product) })))
}
