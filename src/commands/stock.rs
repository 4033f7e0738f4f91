//! Stock ledger: the only code that moves `products.quantity`.
//!
//! A decrement is a single conditional UPDATE (`quantity >= n`), so no
//! interleaving of writers can take a product below zero. Batches run
//! inside one immediate transaction: every line is checked first, then
//! applied, and any failure rolls back the lines already applied.

use super::products::require_product;
use crate::db::Database;
use crate::error::{LedgerError, Result, Shortage};
use crate::models::{Product, StockLine};
use chrono::{Local, NaiveDate};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;

pub fn decrement_if_sufficient(db: &Database, product_id: i64, quantity: i64) -> Result<Product> {
    db.write(|tx| {
        check_quantity(product_id, quantity)?;
        apply_decrement(tx, product_id, quantity)?;
        require_product(tx, product_id)
    })
}

/// Deduct a batch of sale lines as one unit.
pub fn decrement_batch(db: &Database, lines: &[StockLine]) -> Result<Vec<Product>> {
    db.write(|tx| {
        let merged = apply_batch(tx, lines)?;
        merged
            .iter()
            .map(|line| require_product(tx, line.product_id))
            .collect()
    })
}

pub fn increment(db: &Database, product_id: i64, quantity: i64) -> Result<Product> {
    let today = Local::now().date_naive();
    db.write(|tx| {
        check_quantity(product_id, quantity)?;
        apply_increment(tx, product_id, quantity, today)?;
        require_product(tx, product_id)
    })
}

/// Restock several products at once, keyed by product id.
pub fn restock(db: &Database, batch: &BTreeMap<i64, i64>) -> Result<Vec<Product>> {
    if batch.is_empty() {
        return Err(LedgerError::Validation("restock batch is empty".into()));
    }
    for (&product_id, &quantity) in batch {
        check_quantity(product_id, quantity)?;
    }

    let today = Local::now().date_naive();
    db.write(|tx| {
        for (&product_id, &quantity) in batch {
            apply_increment(tx, product_id, quantity, today)?;
        }
        batch
            .keys()
            .map(|&product_id| require_product(tx, product_id))
            .collect()
    })
}

pub(crate) fn check_quantity(product_id: i64, quantity: i64) -> Result<()> {
    if quantity <= 0 {
        return Err(LedgerError::invalid_quantity(
            format!("product {product_id}"),
            quantity,
        ));
    }
    Ok(())
}

/// Merge repeated products so each is checked against its combined demand.
/// First-seen order is kept. A combined demand past `i64::MAX` is an
/// invalid quantity.
pub(crate) fn merge_lines(lines: impl IntoIterator<Item = StockLine>) -> Result<Vec<StockLine>> {
    let mut merged: Vec<StockLine> = Vec::new();
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| {
                        LedgerError::invalid_quantity(
                            format!("combined demand for product {}", line.product_id),
                            line.quantity,
                        )
                    })?;
            }
            None => merged.push(line),
        }
    }
    Ok(merged)
}

/// Report every line the shelf cannot cover, without writing anything.
pub(crate) fn check_available(conn: &Connection, lines: &[StockLine]) -> Result<()> {
    let mut shortages = Vec::new();

    for line in lines {
        let product = require_product(conn, line.product_id)?;
        if product.quantity < line.quantity {
            shortages.push(Shortage {
                product_id: product.id,
                name: product.name,
                requested: line.quantity,
                available: product.quantity,
            });
        }
    }

    if shortages.is_empty() {
        Ok(())
    } else {
        Err(LedgerError::InsufficientStock(shortages))
    }
}

/// Validate then deduct. Callers must run this inside a transaction so a
/// late failure undoes earlier lines.
pub(crate) fn apply_batch(conn: &Connection, lines: &[StockLine]) -> Result<Vec<StockLine>> {
    if lines.is_empty() {
        return Err(LedgerError::Validation("no stock lines given".into()));
    }
    for line in lines {
        check_quantity(line.product_id, line.quantity)?;
    }

    let merged = merge_lines(lines.iter().copied())?;
    check_available(conn, &merged)?;

    for line in &merged {
        apply_decrement(conn, line.product_id, line.quantity)?;
    }
    Ok(merged)
}

pub(crate) fn apply_decrement(conn: &Connection, product_id: i64, quantity: i64) -> Result<()> {
    let changed = conn.execute(
        "UPDATE products SET quantity = quantity - ?1 WHERE id = ?2 AND quantity >= ?1",
        params![quantity, product_id],
    )?;

    if changed == 0 {
        let product = require_product(conn, product_id)?;
        tracing::warn!(
            product_id,
            requested = quantity,
            available = product.quantity,
            "stock decrement refused"
        );
        return Err(LedgerError::insufficient(Shortage {
            product_id,
            name: product.name,
            requested: quantity,
            available: product.quantity,
        }));
    }

    tracing::debug!(product_id, quantity, "stock decremented");
    Ok(())
}

/// Add stock. A product sitting at zero starts a fresh lot, so its receive
/// date moves to `received_on`. Totals that would pass `i64::MAX` are
/// refused.
pub(crate) fn apply_increment(
    conn: &Connection,
    product_id: i64,
    quantity: i64,
    received_on: NaiveDate,
) -> Result<()> {
    let product = require_product(conn, product_id)?;
    if product.quantity.checked_add(quantity).is_none() {
        return Err(LedgerError::invalid_quantity(
            format!("restock of {} holding {}", product.name, product.quantity),
            quantity,
        ));
    }

    conn.execute(
        "UPDATE products SET
            date_received = CASE WHEN quantity = 0 THEN ?3 ELSE date_received END,
            quantity = quantity + ?2
         WHERE id = ?1",
        params![product_id, quantity, received_on],
    )?;

    tracing::info!(product_id, quantity, "stock restocked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_lines_sums_repeated_products() {
        let merged = merge_lines([
            StockLine { product_id: 2, quantity: 3 },
            StockLine { product_id: 1, quantity: 1 },
            StockLine { product_id: 2, quantity: 4 },
        ])
        .unwrap();
        assert_eq!(
            merged,
            vec![
                StockLine { product_id: 2, quantity: 7 },
                StockLine { product_id: 1, quantity: 1 },
            ]
        );
    }

    #[test]
    fn merge_lines_refuses_overflowing_demand() {
        let result = merge_lines([
            StockLine { product_id: 7, quantity: i64::MAX },
            StockLine { product_id: 7, quantity: i64::MAX },
        ]);
        assert!(matches!(result, Err(LedgerError::InvalidQuantity { .. })));

        let apart = merge_lines([
            StockLine { product_id: 7, quantity: i64::MAX },
            StockLine { product_id: 8, quantity: i64::MAX },
        ])
        .unwrap();
        assert_eq!(apart.len(), 2);
    }

    #[test]
    fn zero_or_negative_quantity_is_rejected() {
        assert!(matches!(
            check_quantity(1, 0),
            Err(LedgerError::InvalidQuantity { quantity: 0, .. })
        ));
        assert!(check_quantity(1, -4).is_err());
        assert!(check_quantity(1, 1).is_ok());
    }
}
