//! Sale endpoints.
//!
//! - POST /transactions/create   - check out a cart
//! - GET  /transactions          - journal, newest first
//! - GET  /transactions/summary  - daily totals

use super::error::AppError;
use super::state::AppState;
use crate::commands::{reports, transactions};
use crate::models::{CreateTransaction, SalesSummary, Transaction, TransactionType};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub date: Option<NaiveDate>,
}

pub async fn create_transaction(
    State(state): State<AppState>,
    Json(request): Json<CreateTransaction>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let transaction = state
        .run(move |db| transactions::create_transaction(db, request))
        .await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let transactions = state
        .run(move |db| transactions::get_transactions(db, query.transaction_type, query.limit))
        .await?;
    Ok(Json(transactions))
}

pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SalesSummary>, AppError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let summary = state
        .run(move |db| reports::sales_summary(db, date))
        .await?;
    Ok(Json(summary))
}
