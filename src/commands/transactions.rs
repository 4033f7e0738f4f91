use super::composite::{receipt_lines, resolve, to_stock_lines};
use super::round_cents;
use super::stock::{apply_decrement, check_available, merge_lines};
use crate::db::{json_column, json_column_opt, label_column, Database};
use crate::error::{LedgerError, Result};
use crate::models::{CreateTransaction, PaymentMethod, Transaction, TransactionType};
use chrono::Utc;
use rusqlite::{params, Connection, Row};

const TRANSACTION_COLUMNS: &str = "id, transaction_type, items, subtotal, discount_amount, total_amount, payment_method, event_details, created_at";

/// Amount a caller-supplied total may differ from ours before it is refused.
const TOTAL_TOLERANCE: f64 = 0.01;

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        transaction_type: label_column(row, 1, TransactionType::from_db)?,
        items: json_column(row, 2)?,
        subtotal: row.get(3)?,
        discount_amount: row.get(4)?,
        total_amount: row.get(5)?,
        payment_method: label_column(row, 6, PaymentMethod::from_db)?,
        event_details: json_column_opt(row, 7)?,
        created_at: row.get(8)?,
    })
}

fn find_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    let transaction = conn.query_row(
        &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"),
        [id],
        transaction_from_row,
    )?;
    Ok(transaction)
}

/// Record a sale and deduct its stock in one SQLite transaction.
///
/// Every deduction is checked before anything is written; a shortfall fails
/// with `InsufficientStock` listing each short product. The sale row and
/// the decrements commit together or not at all.
pub fn create_transaction(db: &Database, request: CreateTransaction) -> Result<Transaction> {
    if request.items.is_empty() {
        return Err(LedgerError::Validation("cart is empty".into()));
    }

    let deductions = resolve(&request.items)?;
    let stock_lines = merge_lines(to_stock_lines(&deductions))?;
    let (subtotal, discount, total) = price_cart(&request)?;

    let items = serde_json::to_string(&receipt_lines(&request.items))?;
    let event_details = request
        .event_details
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let transaction = db.write(|tx| {
        check_available(tx, &stock_lines)?;

        tx.execute(
            "INSERT INTO transactions (transaction_type, items, subtotal, discount_amount, total_amount, payment_method, event_details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                request.transaction_type.as_str(),
                items,
                subtotal,
                discount,
                total,
                request.payment_method.as_str(),
                event_details,
                Utc::now(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        for line in &stock_lines {
            apply_decrement(tx, line.product_id, line.quantity)?;
        }

        find_transaction(tx, id)
    })?;

    tracing::info!(
        transaction_id = transaction.id,
        kind = transaction.transaction_type.as_str(),
        lines = transaction.items.len(),
        products = stock_lines.len(),
        total = transaction.total_amount,
        "transaction recorded"
    );
    Ok(transaction)
}

/// Compute subtotal, discount and total from the cart, checking any figures
/// the register sent against them.
fn price_cart(request: &CreateTransaction) -> Result<(f64, f64, f64)> {
    let mut subtotal = 0.0;
    for line in &request.items {
        let price = line.price();
        if !price.is_finite() || price < 0.0 {
            return Err(LedgerError::InvalidAmount(format!(
                "line price must be a non-negative number, got {price}"
            )));
        }
        subtotal += price * line.quantity() as f64;
    }
    let subtotal = round_cents(subtotal);

    let discount = request.discount_amount;
    if !discount.is_finite() || discount < 0.0 || discount > subtotal {
        return Err(LedgerError::InvalidAmount(format!(
            "discount {discount} must be between 0 and the subtotal {subtotal}"
        )));
    }
    let discount = round_cents(discount);
    let total = round_cents(subtotal - discount);

    if let Some(sent) = request.subtotal {
        if (sent - subtotal).abs() > TOTAL_TOLERANCE {
            return Err(LedgerError::Validation(format!(
                "subtotal {sent} does not match cart subtotal {subtotal}"
            )));
        }
    }
    if let Some(sent) = request.total_amount {
        if (sent - total).abs() > TOTAL_TOLERANCE {
            return Err(LedgerError::Validation(format!(
                "total {sent} does not match cart total {total}"
            )));
        }
    }

    Ok((subtotal, discount, total))
}

pub fn get_transactions(
    db: &Database,
    transaction_type: Option<TransactionType>,
    limit: Option<u32>,
) -> Result<Vec<Transaction>> {
    let conn = db.lock()?;
    let limit = i64::from(limit.unwrap_or(u32::MAX));

    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions
         WHERE ?1 IS NULL OR transaction_type = ?1
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    ))?;
    let transactions = stmt
        .query_map(
            params![transaction_type.map(TransactionType::as_str), limit],
            transaction_from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(transactions)
}
