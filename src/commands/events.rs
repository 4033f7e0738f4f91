//! Event payment ledger.
//!
//! An event row is one document: its product snapshot and payment history
//! are JSON columns, and the money columns next to them are always the
//! output of [`derive_event_totals`] over those two lists. Every write goes
//! through [`save_event`], which recomputes them and bumps `version`.

use super::products::require_product;
use super::round_cents;
use super::stock::{apply_batch, merge_lines};
use crate::db::{json_column, label_column, Database};
use crate::error::{LedgerError, Result};
use crate::models::{
    CreateEvent, Event, EventProduct, EventProductInput, EventStatus, EventTotals, NewPayment,
    Payment, StockLine, UpdateEvent,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

const EVENT_COLUMNS: &str = "id, customer_name, contact_number, email, venue, notes, event_date, products, payment_history, total_amount, total_paid, remaining_balance, status, version, created_at, updated_at";

const MAX_WRITE_ATTEMPTS: usize = 3;

/// Settlement figures for a product snapshot and payment history.
pub fn derive_event_totals(
    products: &[EventProduct],
    payments: &[Payment],
    cancelled: bool,
) -> EventTotals {
    let total_amount = round_cents(
        products
            .iter()
            .map(|p| p.price * p.quantity as f64)
            .sum::<f64>(),
    );
    let total_paid = round_cents(payments.iter().map(|p| p.amount).sum::<f64>());
    let remaining_balance = round_cents(total_amount - total_paid);

    let status = if cancelled {
        EventStatus::Cancelled
    } else if total_amount > 0.0 && remaining_balance <= 0.0 {
        EventStatus::FullyPaid
    } else {
        EventStatus::Pending
    };

    EventTotals {
        total_amount,
        total_paid,
        remaining_balance,
        status,
    }
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        customer_name: row.get(1)?,
        contact_number: row.get(2)?,
        email: row.get(3)?,
        venue: row.get(4)?,
        notes: row.get(5)?,
        event_date: row.get(6)?,
        products: json_column(row, 7)?,
        payment_history: json_column(row, 8)?,
        totals: EventTotals {
            total_amount: row.get(9)?,
            total_paid: row.get(10)?,
            remaining_balance: row.get(11)?,
            status: label_column(row, 12, EventStatus::from_db)?,
        },
        version: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn find_event(conn: &Connection, id: i64) -> Result<Event> {
    conn.query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
        [id],
        event_from_row,
    )
    .optional()?
    .ok_or(LedgerError::EventNotFound(id))
}

/// Write `event` back, recomputing its totals. Fails with `Conflict` when
/// the stored version is no longer the one `event` was read at.
fn save_event(conn: &Connection, event: &Event, cancelled: bool) -> Result<()> {
    let totals = derive_event_totals(&event.products, &event.payment_history, cancelled);

    let changed = conn.execute(
        "UPDATE events SET
            customer_name = ?1, contact_number = ?2, email = ?3, venue = ?4, notes = ?5,
            event_date = ?6, products = ?7, payment_history = ?8,
            total_amount = ?9, total_paid = ?10, remaining_balance = ?11, status = ?12,
            version = version + 1, updated_at = ?13
         WHERE id = ?14 AND version = ?15",
        params![
            event.customer_name,
            event.contact_number,
            event.email,
            event.venue,
            event.notes,
            event.event_date,
            serde_json::to_string(&event.products)?,
            serde_json::to_string(&event.payment_history)?,
            totals.total_amount,
            totals.total_paid,
            totals.remaining_balance,
            totals.status.as_str(),
            Utc::now(),
            event.id,
            event.version,
        ],
    )?;

    if changed == 0 {
        return Err(LedgerError::Conflict(format!("event {}", event.id)));
    }
    Ok(())
}

/// Read-modify-write one event inside an immediate transaction, retrying a
/// few times if the version check loses a race.
fn mutate_event<F>(db: &Database, id: i64, apply: F) -> Result<Event>
where
    F: Fn(&Connection, &mut Event) -> Result<()>,
{
    let mut attempt = 1;
    loop {
        let outcome = db.write(|tx| {
            let conn: &Connection = tx;
            let mut event = find_event(conn, id)?;
            apply(conn, &mut event)?;
            let cancelled = event.totals.status == EventStatus::Cancelled;
            save_event(conn, &event, cancelled)?;
            find_event(conn, id)
        });

        match outcome {
            Err(LedgerError::Conflict(what)) if attempt < MAX_WRITE_ATTEMPTS => {
                tracing::warn!(event_id = id, attempt, "retrying write to {what}");
                attempt += 1;
            }
            other => return other,
        }
    }
}

fn ensure_open(event: &Event) -> Result<()> {
    if event.totals.status == EventStatus::Cancelled {
        return Err(LedgerError::AlreadyCancelled(event.id));
    }
    Ok(())
}

fn check_payment(payment: &NewPayment) -> Result<()> {
    if !payment.amount.is_finite() || payment.amount <= 0.0 {
        return Err(LedgerError::InvalidAmount(format!(
            "payment must be greater than zero, got {}",
            payment.amount
        )));
    }
    Ok(())
}

fn append_payment(event: &mut Event, payment: &NewPayment) {
    event.payment_history.push(Payment {
        amount: round_cents(payment.amount),
        date: Utc::now(),
        method: payment.method,
    });
}

/// Price each requested line at today's catalog price unless the order
/// carries its own.
fn snapshot_products(conn: &Connection, inputs: &[EventProductInput]) -> Result<Vec<EventProduct>> {
    inputs
        .iter()
        .map(|input| {
            if input.quantity <= 0 {
                return Err(LedgerError::invalid_quantity(
                    format!("product {}", input.product_id),
                    input.quantity,
                ));
            }
            let product = require_product(conn, input.product_id)?;
            let price = input.price.unwrap_or(product.price);
            if !price.is_finite() || price < 0.0 {
                return Err(LedgerError::InvalidAmount(format!(
                    "price for {} must be a non-negative number, got {price}",
                    product.name
                )));
            }
            Ok(EventProduct {
                product_id: product.id,
                name: product.name,
                quantity: input.quantity,
                price,
            })
        })
        .collect()
}

/// Stock each product needs beyond what the previous snapshot already took.
pub(crate) fn added_quantities(
    previous: &[EventProduct],
    next: &[EventProduct],
) -> Result<Vec<StockLine>> {
    let before = merge_lines(previous.iter().map(|p| StockLine {
        product_id: p.product_id,
        quantity: p.quantity,
    }))?;
    let after = merge_lines(next.iter().map(|p| StockLine {
        product_id: p.product_id,
        quantity: p.quantity,
    }))?;

    let added = after
        .into_iter()
        .filter_map(|line| {
            let already = before
                .iter()
                .find(|b| b.product_id == line.product_id)
                .map_or(0, |b| b.quantity);
            let delta = line.quantity - already;
            (delta > 0).then_some(StockLine {
                product_id: line.product_id,
                quantity: delta,
            })
        })
        .collect();
    Ok(added)
}

/// Swap in a new product snapshot, deducting stock for what it adds.
fn replace_products(conn: &Connection, event: &mut Event, inputs: &[EventProductInput]) -> Result<()> {
    let snapshot = snapshot_products(conn, inputs)?;
    let added = added_quantities(&event.products, &snapshot)?;
    if !added.is_empty() {
        apply_batch(conn, &added)?;
        tracing::info!(event_id = event.id, products = added.len(), "event stock deducted");
    }
    event.products = snapshot;
    Ok(())
}

pub fn create_event(db: &Database, request: CreateEvent) -> Result<Event> {
    let customer_name = request.customer_name.trim();
    if customer_name.is_empty() {
        return Err(LedgerError::Validation("customer name is required".into()));
    }
    if let Some(deposit) = &request.deposit {
        check_payment(deposit)?;
    }

    let event = db.write(|tx| {
        let now = Utc::now();
        tx.execute(
            "INSERT INTO events (customer_name, contact_number, email, venue, notes, event_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                customer_name,
                request.contact_number,
                request.email,
                request.venue,
                request.notes,
                request.event_date,
                now,
            ],
        )?;

        let mut event = find_event(tx, tx.last_insert_rowid())?;
        if !request.products.is_empty() {
            replace_products(tx, &mut event, &request.products)?;
        }
        if let Some(deposit) = &request.deposit {
            append_payment(&mut event, deposit);
        }
        save_event(tx, &event, false)?;
        find_event(tx, event.id)
    })?;

    tracing::info!(
        event_id = event.id,
        total = event.totals.total_amount,
        "event scheduled"
    );
    Ok(event)
}

pub fn record_payment(db: &Database, id: i64, payment: NewPayment) -> Result<Event> {
    check_payment(&payment)?;

    let event = mutate_event(db, id, |_, event| {
        ensure_open(event)?;
        append_payment(event, &payment);
        Ok(())
    })?;

    tracing::info!(
        event_id = id,
        amount = payment.amount,
        remaining = event.totals.remaining_balance,
        status = event.totals.status.as_str(),
        "event payment recorded"
    );
    Ok(event)
}

/// Replace the event's product list. If the added stock cannot be
/// deducted the event is left exactly as it was.
pub fn finalize_products(db: &Database, id: i64, products: Vec<EventProductInput>) -> Result<Event> {
    mutate_event(db, id, |conn, event| {
        ensure_open(event)?;
        replace_products(conn, event, &products)
    })
}

/// Apply descriptive edits, a new product list and a payment as one write.
pub fn update_event(db: &Database, id: i64, update: UpdateEvent) -> Result<Event> {
    if let Some(payment) = &update.payment {
        check_payment(payment)?;
    }
    if update
        .customer_name
        .as_deref()
        .is_some_and(|name| name.trim().is_empty())
    {
        return Err(LedgerError::Validation("customer name cannot be blank".into()));
    }

    let event = mutate_event(db, id, |conn, event| {
        if update.products.is_some() || update.payment.is_some() {
            ensure_open(event)?;
        }

        if let Some(name) = &update.customer_name {
            event.customer_name = name.trim().to_string();
        }
        if let Some(contact) = &update.contact_number {
            event.contact_number = Some(contact.clone());
        }
        if let Some(email) = &update.email {
            event.email = Some(email.clone());
        }
        if let Some(venue) = &update.venue {
            event.venue = Some(venue.clone());
        }
        if let Some(notes) = &update.notes {
            event.notes = Some(notes.clone());
        }
        if let Some(date) = update.event_date {
            event.event_date = date;
        }

        if let Some(products) = &update.products {
            replace_products(conn, event, products)?;
        }
        if let Some(payment) = &update.payment {
            append_payment(event, payment);
        }
        Ok(())
    })?;

    tracing::info!(event_id = id, version = event.version, "event updated");
    Ok(event)
}

pub fn cancel_event(db: &Database, id: i64) -> Result<Event> {
    let event = mutate_event(db, id, |_, event| {
        ensure_open(event)?;
        event.totals.status = EventStatus::Cancelled;
        Ok(())
    })?;

    tracing::info!(event_id = id, "event cancelled");
    Ok(event)
}

pub fn get_events(db: &Database) -> Result<Vec<Event>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {EVENT_COLUMNS} FROM events ORDER BY event_date, id"
    ))?;
    let events = stmt
        .query_map([], event_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(events)
}

pub fn get_event(db: &Database, id: i64) -> Result<Event> {
    let conn = db.lock()?;
    find_event(&conn, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentMethod;

    fn line(product_id: i64, quantity: i64, price: f64) -> EventProduct {
        EventProduct {
            product_id,
            name: format!("product {product_id}"),
            quantity,
            price,
        }
    }

    fn paid(amount: f64) -> Payment {
        Payment {
            amount,
            date: Utc::now(),
            method: PaymentMethod::Cash,
        }
    }

    #[test]
    fn full_payment_settles_event() {
        let products = [line(1, 10, 100.0)];
        let totals = derive_event_totals(&products, &[paid(400.0), paid(600.0)], false);
        assert_eq!(totals.total_amount, 1000.0);
        assert_eq!(totals.remaining_balance, 0.0);
        assert_eq!(totals.status, EventStatus::FullyPaid);
    }

    #[test]
    fn partial_payment_stays_pending() {
        let products = [line(1, 10, 100.0)];
        let totals = derive_event_totals(&products, &[paid(400.0), paid(300.0)], false);
        assert_eq!(totals.total_paid, 700.0);
        assert_eq!(totals.remaining_balance, 300.0);
        assert_eq!(totals.status, EventStatus::Pending);
    }

    #[test]
    fn event_without_products_is_pending() {
        let totals = derive_event_totals(&[], &[paid(50.0)], false);
        assert_eq!(totals.total_amount, 0.0);
        assert_eq!(totals.remaining_balance, -50.0);
        assert_eq!(totals.status, EventStatus::Pending);
    }

    #[test]
    fn overpayment_is_fully_paid() {
        let totals = derive_event_totals(&[line(1, 1, 80.0)], &[paid(100.0)], false);
        assert_eq!(totals.remaining_balance, -20.0);
        assert_eq!(totals.status, EventStatus::FullyPaid);
    }

    #[test]
    fn cancellation_overrides_balance() {
        let totals = derive_event_totals(&[line(1, 1, 80.0)], &[paid(80.0)], true);
        assert_eq!(totals.status, EventStatus::Cancelled);
        assert_eq!(totals.remaining_balance, 0.0);
    }

    #[test]
    fn cents_do_not_drift() {
        let totals = derive_event_totals(
            &[line(1, 3, 0.1)],
            &[paid(0.1), paid(0.1), paid(0.1)],
            false,
        );
        assert_eq!(totals.remaining_balance, 0.0);
        assert_eq!(totals.status, EventStatus::FullyPaid);
    }

    #[test]
    fn added_quantities_only_counts_growth() {
        let previous = [line(1, 5, 2.0), line(2, 3, 4.0)];
        let next = [line(1, 8, 2.0), line(2, 1, 4.0), line(3, 2, 6.0), line(3, 1, 6.0)];
        assert_eq!(
            added_quantities(&previous, &next).unwrap(),
            vec![
                StockLine { product_id: 1, quantity: 3 },
                StockLine { product_id: 3, quantity: 3 },
            ]
        );
    }
}
