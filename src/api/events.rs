//! Event endpoints.
//!
//! - GET /events              - all events by date
//! - GET /events/:id          - one event
//! - POST /events/create      - schedule an event
//! - PUT /events/update/:id   - edit details, finalize products, take a payment
//! - PUT /events/:id/cancel   - cancel (terminal)

use super::error::AppError;
use super::state::AppState;
use crate::commands::events;
use crate::models::{CreateEvent, Event, UpdateEvent};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

pub async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, AppError> {
    let events = state.run(events::get_events).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Event>, AppError> {
    let event = state.run(move |db| events::get_event(db, id)).await?;
    Ok(Json(event))
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(request): Json<CreateEvent>,
) -> Result<(StatusCode, Json<Event>), AppError> {
    let event = state
        .run(move |db| events::create_event(db, request))
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<UpdateEvent>,
) -> Result<Json<Event>, AppError> {
    let event = state
        .run(move |db| events::update_event(db, id, update))
        .await?;
    Ok(Json(event))
}

pub async fn cancel_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Event>, AppError> {
    let event = state.run(move |db| events::cancel_event(db, id)).await?;
    Ok(Json(event))
}
