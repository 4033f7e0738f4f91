//! HTTP error responses.
//!
//! Every handler returns `Result<_, AppError>`. Ledger errors are mapped to
//! a status code and a stable `code` string the register can branch on;
//! stock shortages also carry per-product `details`.

use crate::error::LedgerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    details: Option<serde_json::Value>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            details: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "{}", self.message
                ),
                None => tracing::error!(status = %self.status, code = self.code, "{}", self.message),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            details: self.details,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::InsufficientStock(shortages) => {
                Self::new(StatusCode::CONFLICT, "INSUFFICIENT_STOCK", message)
                    .with_details(serde_json::json!(shortages))
            }
            LedgerError::ProductNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "PRODUCT_NOT_FOUND", message)
            }
            LedgerError::EventNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "EVENT_NOT_FOUND", message)
            }
            LedgerError::InvalidQuantity { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_QUANTITY", message)
            }
            LedgerError::InvalidAmount(_) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_AMOUNT", message)
            }
            LedgerError::Validation(_) => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
            }
            LedgerError::AlreadyCancelled(_) => {
                Self::new(StatusCode::CONFLICT, "ALREADY_CANCELLED", message)
            }
            LedgerError::Conflict(_) => Self::new(StatusCode::CONFLICT, "CONFLICT", message),
            LedgerError::LockPoisoned
            | LedgerError::Io(_)
            | LedgerError::Database(_)
            | LedgerError::Serialization(_) => {
                Self::internal("An internal error occurred").with_source(anyhow::Error::new(err))
            }
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal("An internal error occurred").with_source(anyhow::Error::new(err))
    }
}
