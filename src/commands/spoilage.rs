use super::products::{product_from_row, PRODUCT_COLUMNS};
use crate::db::Database;
use crate::error::Result;
use crate::models::{Product, SpoiledLot, SweepReport};
use chrono::{Days, NaiveDate};
use rusqlite::{params, Connection, Row};

const LOT_COLUMNS: &str = "id, product_id, name, category, quantity_spoiled, supplier, date_received, expired_on, date_spoiled";

fn lot_from_row(row: &Row<'_>) -> rusqlite::Result<SpoiledLot> {
    Ok(SpoiledLot {
        id: row.get(0)?,
        product_id: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        quantity_spoiled: row.get(4)?,
        supplier: row.get(5)?,
        date_received: row.get(6)?,
        expired_on: row.get(7)?,
        date_spoiled: row.get(8)?,
    })
}

/// Last day a lot received on `date_received` is still sellable.
pub fn expiration_date(product: &Product) -> NaiveDate {
    let days = u64::try_from(product.lifespan_days).unwrap_or(0);
    product
        .date_received
        .checked_add_days(Days::new(days))
        .unwrap_or(NaiveDate::MAX)
}

pub fn is_expired(product: &Product, as_of: NaiveDate) -> bool {
    product.quantity > 0 && expiration_date(product) < as_of
}

/// Move every expired product's remaining stock into the spoilage ledger.
///
/// Products are zeroed, not deleted, since past sales still refer to them.
/// A zeroed product no longer matches, so sweeping the same day twice
/// records nothing the second time.
pub fn sweep(db: &Database, as_of: NaiveDate) -> Result<SweepReport> {
    let lots = db.write(|tx| {
        let expired = expired_products(tx, as_of)?;
        let mut lots = Vec::with_capacity(expired.len());

        for product in expired {
            let changed = tx.execute(
                "UPDATE products SET quantity = 0 WHERE id = ?1 AND quantity = ?2",
                params![product.id, product.quantity],
            )?;
            if changed == 0 {
                continue;
            }

            tx.execute(
                "INSERT INTO spoiled_lots (product_id, name, category, quantity_spoiled, supplier, date_received, expired_on, date_spoiled)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    product.id,
                    product.name,
                    product.category,
                    product.quantity,
                    product.supplier,
                    product.date_received,
                    expiration_date(&product),
                    as_of,
                ],
            )?;
            let id = tx.last_insert_rowid();

            tracing::info!(
                product_id = product.id,
                quantity = product.quantity,
                "expired stock moved to spoilage"
            );
            lots.push(find_lot(tx, id)?);
        }

        Ok(lots)
    })?;

    tracing::info!(%as_of, processed = lots.len(), "spoilage sweep finished");
    Ok(SweepReport {
        as_of,
        processed: lots.len(),
        lots,
    })
}

fn expired_products(conn: &Connection, as_of: NaiveDate) -> Result<Vec<Product>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE quantity > 0 ORDER BY id"
    ))?;
    let products = stmt
        .query_map([], product_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(products
        .into_iter()
        .filter(|product| is_expired(product, as_of))
        .collect())
}

fn find_lot(conn: &Connection, id: i64) -> Result<SpoiledLot> {
    let lot = conn.query_row(
        &format!("SELECT {LOT_COLUMNS} FROM spoiled_lots WHERE id = ?1"),
        [id],
        lot_from_row,
    )?;
    Ok(lot)
}

pub fn get_spoiled_lots(db: &Database) -> Result<Vec<SpoiledLot>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {LOT_COLUMNS} FROM spoiled_lots ORDER BY date_spoiled DESC, id DESC"
    ))?;
    let lots = stmt
        .query_map([], lot_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(lots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(received: NaiveDate, lifespan_days: i64, quantity: i64) -> Product {
        Product {
            id: 1,
            name: "Peony".into(),
            category: "Flowers".into(),
            price: 4.0,
            quantity,
            supplier: None,
            date_received: received,
            lifespan_days,
            low_stock_threshold: 5,
            created_at: Utc::now(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn expires_strictly_after_lifespan() {
        let peony = product(day(1), 5, 10);
        assert_eq!(expiration_date(&peony), day(6));
        assert!(!is_expired(&peony, day(6)));
        assert!(is_expired(&peony, day(7)));
    }

    #[test]
    fn empty_product_never_expires() {
        assert!(!is_expired(&product(day(1), 1, 0), day(20)));
    }
}
