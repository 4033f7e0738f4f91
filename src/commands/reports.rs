use crate::db::Database;
use crate::error::Result;
use crate::models::SalesSummary;
use chrono::NaiveDate;

/// Totals for one calendar day (UTC) of sales and spoilage.
pub fn sales_summary(db: &Database, date: NaiveDate) -> Result<SalesSummary> {
    let conn = db.lock()?;

    let (total, retail, event, gross, discounts, net): (i64, i64, i64, f64, f64, f64) = conn
        .query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(transaction_type = 'retail'), 0),
                    COALESCE(SUM(transaction_type = 'event'), 0),
                    COALESCE(SUM(subtotal), 0),
                    COALESCE(SUM(discount_amount), 0),
                    COALESCE(SUM(total_amount), 0)
             FROM transactions
             WHERE date(created_at) = ?1",
            [date],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )?;

    let units_spoiled: i64 = conn.query_row(
        "SELECT COALESCE(SUM(quantity_spoiled), 0) FROM spoiled_lots WHERE date_spoiled = ?1",
        [date],
        |row| row.get(0),
    )?;

    Ok(SalesSummary {
        date,
        total_transactions: total,
        retail_transactions: retail,
        event_transactions: event,
        gross_sales: gross,
        total_discounts: discounts,
        net_sales: net,
        units_spoiled,
    })
}
