use super::error::AppError;
use crate::db::Database;
use crate::error::Result as LedgerResult;
use std::sync::Arc;

/// Shared by every handler; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub low_stock_default: i64,
}

impl AppState {
    pub fn new(db: Arc<Database>, low_stock_default: i64) -> Self {
        Self {
            db,
            low_stock_default,
        }
    }

    /// Run a blocking ledger operation on Tokio's blocking pool.
    pub async fn run<T, F>(&self, op: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> LedgerResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let value = tokio::task::spawn_blocking(move || op(&db)).await??;
        Ok(value)
    }
}
