//! REST surface consumed by the register and back-office UI.
//!
//! Authentication and role checks happen upstream; handlers assume an
//! authenticated cashier or admin.

pub mod error;
pub mod events;
pub mod health;
pub mod products;
pub mod spoilage;
pub mod state;
pub mod transactions;

pub use error::AppError;
pub use state::AppState;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        // Catalog and stock ledger
        .route(
            "/products",
            get(products::list_products).post(products::create_product),
        )
        .route("/products/low-stock", get(products::low_stock))
        .route("/products/restock", post(products::restock))
        .route("/products/update-stock", post(products::update_stock))
        .route("/products/:id", put(products::edit_product))
        // Sales
        .route("/transactions", get(transactions::list_transactions))
        .route("/transactions/create", post(transactions::create_transaction))
        .route("/transactions/summary", get(transactions::summary))
        // Events
        .route("/events", get(events::list_events))
        .route("/events/create", post(events::create_event))
        .route("/events/update/:id", put(events::update_event))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id/cancel", put(events::cancel_event))
        // Spoilage
        .route("/spoilage", get(spoilage::list_lots))
        .route("/spoilage/process", post(spoilage::process))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
