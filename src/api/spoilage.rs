use super::error::AppError;
use super::state::AppState;
use crate::commands::spoilage;
use crate::models::{SpoiledLot, SweepReport};
use axum::{extract::State, Json};
use chrono::{Local, NaiveDate};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSpoilage {
    pub as_of: Option<NaiveDate>,
}

/// Sweep expired stock as of the given date, or today.
pub async fn process(
    State(state): State<AppState>,
    body: Option<Json<ProcessSpoilage>>,
) -> Result<Json<SweepReport>, AppError> {
    let as_of = body
        .and_then(|Json(request)| request.as_of)
        .unwrap_or_else(|| Local::now().date_naive());
    let report = state.run(move |db| spoilage::sweep(db, as_of)).await?;
    Ok(Json(report))
}

pub async fn list_lots(State(state): State<AppState>) -> Result<Json<Vec<SpoiledLot>>, AppError> {
    let lots = state.run(spoilage::get_spoiled_lots).await?;
    Ok(Json(lots))
}
