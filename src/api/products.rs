//! Catalog and stock endpoints.
//!
//! - GET  /products               - list catalog
//! - POST /products               - register a product
//! - GET  /products/low-stock     - products at or under their threshold
//! - POST /products/restock       - batch `{productId: qty}` restock
//! - POST /products/update-stock  - batch sale deduction
//! - PUT  /products/:id           - edit descriptive fields

use super::error::AppError;
use super::state::AppState;
use crate::commands::{products, stock};
use crate::models::{NewProduct, Product, ProductEdit, StockLine};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::collections::BTreeMap;

pub async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    let products = state.run(products::get_products).await?;
    Ok(Json(products))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(mut product): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    product.low_stock_threshold.get_or_insert(state.low_stock_default);
    let product = state
        .run(move |db| products::create_product(db, product))
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn low_stock(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    let products = state.run(products::get_low_stock).await?;
    Ok(Json(products))
}

pub async fn restock(
    State(state): State<AppState>,
    Json(batch): Json<BTreeMap<i64, i64>>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = state.run(move |db| stock::restock(db, &batch)).await?;
    Ok(Json(products))
}

pub async fn update_stock(
    State(state): State<AppState>,
    Json(lines): Json<Vec<StockLine>>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = state
        .run(move |db| stock::decrement_batch(db, &lines))
        .await?;
    Ok(Json(products))
}

pub async fn edit_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(edit): Json<ProductEdit>,
) -> Result<Json<Product>, AppError> {
    let product = state
        .run(move |db| products::edit_product(db, id, edit))
        .await?;
    Ok(Json(product))
}
