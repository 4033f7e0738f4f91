//! Errors raised by the inventory and settlement core.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// One product that could not cover a requested deduction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortage {
    pub product_id: i64,
    pub name: String,
    pub requested: i64,
    pub available: i64,
}

impl fmt::Display for Shortage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not sell {} of {}, only {} in stock",
            self.requested, self.name, self.available
        )
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{}", join_shortages(.0))]
    InsufficientStock(Vec<Shortage>),
    #[error("product {0} not found")]
    ProductNotFound(i64),
    #[error("invalid quantity {quantity} for {context}")]
    InvalidQuantity { context: String, quantity: i64 },
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    #[error("event {0} not found")]
    EventNotFound(i64),
    #[error("event {0} is cancelled")]
    AlreadyCancelled(i64),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("concurrent update of {0}")]
    Conflict(String),
    #[error("database lock poisoned")]
    LockPoisoned,
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub fn insufficient(shortage: Shortage) -> Self {
        Self::InsufficientStock(vec![shortage])
    }

    pub fn invalid_quantity(context: impl Into<String>, quantity: i64) -> Self {
        Self::InvalidQuantity {
            context: context.into(),
            quantity,
        }
    }
}

fn join_shortages(shortages: &[Shortage]) -> String {
    shortages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortage_message_names_product_and_stock() {
        let err = LedgerError::insufficient(Shortage {
            product_id: 3,
            name: "Red Rose".into(),
            requested: 12,
            available: 4,
        });
        assert_eq!(err.to_string(), "could not sell 12 of Red Rose, only 4 in stock");
    }

    #[test]
    fn multiple_shortages_are_joined() {
        let err = LedgerError::InsufficientStock(vec![
            Shortage {
                product_id: 1,
                name: "Tulip".into(),
                requested: 2,
                available: 0,
            },
            Shortage {
                product_id: 2,
                name: "Lily".into(),
                requested: 5,
                available: 1,
            },
        ]);
        assert_eq!(
            err.to_string(),
            "could not sell 2 of Tulip, only 0 in stock; could not sell 5 of Lily, only 1 in stock"
        );
    }
}
