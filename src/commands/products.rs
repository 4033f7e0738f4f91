use crate::db::Database;
use crate::error::{LedgerError, Result};
use crate::models::{NewProduct, Product, ProductEdit, DEFAULT_LOW_STOCK_THRESHOLD};
use chrono::{Local, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, category, price, quantity, supplier, date_received, lifespan_days, low_stock_threshold, created_at";

pub(crate) fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        price: row.get(3)?,
        quantity: row.get(4)?,
        supplier: row.get(5)?,
        date_received: row.get(6)?,
        lifespan_days: row.get(7)?,
        low_stock_threshold: row.get(8)?,
        created_at: row.get(9)?,
    })
}

pub(crate) fn find_product(conn: &Connection, id: i64) -> Result<Option<Product>> {
    let product = conn
        .query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"),
            [id],
            product_from_row,
        )
        .optional()?;
    Ok(product)
}

pub(crate) fn require_product(conn: &Connection, id: i64) -> Result<Product> {
    find_product(conn, id)?.ok_or(LedgerError::ProductNotFound(id))
}

pub fn get_products(db: &Database) -> Result<Vec<Product>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name"
    ))?;
    let products = stmt
        .query_map([], product_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(products)
}

pub fn get_product(db: &Database, id: i64) -> Result<Product> {
    let conn = db.lock()?;
    require_product(&conn, id)
}

/// Register a new product with its opening stock.
pub fn create_product(db: &Database, product: NewProduct) -> Result<Product> {
    let name = product.name.trim();
    if name.is_empty() {
        return Err(LedgerError::Validation("product name is required".into()));
    }
    check_price(product.price)?;
    if product.quantity < 0 {
        return Err(LedgerError::invalid_quantity(
            format!("opening stock of {name}"),
            product.quantity,
        ));
    }
    check_lifespan(product.lifespan_days)?;
    let threshold = product
        .low_stock_threshold
        .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD);
    check_threshold(threshold)?;

    let date_received = product
        .date_received
        .unwrap_or_else(|| Local::now().date_naive());

    let conn = db.lock()?;
    conn.execute(
        "INSERT INTO products (name, category, price, quantity, supplier, date_received, lifespan_days, low_stock_threshold, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            name,
            product.category.trim(),
            product.price,
            product.quantity,
            product.supplier,
            date_received,
            product.lifespan_days,
            threshold,
            Utc::now(),
        ],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(product_id = id, name, quantity = product.quantity, "product registered");

    require_product(&conn, id)
}

/// Update descriptive fields only; on-hand quantity is owned by the stock
/// ledger and never written here.
pub fn edit_product(db: &Database, id: i64, edit: ProductEdit) -> Result<Product> {
    let name = edit.name.as_deref().map(str::trim);
    if name.is_some_and(str::is_empty) {
        return Err(LedgerError::Validation("product name cannot be blank".into()));
    }
    if let Some(price) = edit.price {
        check_price(price)?;
    }
    if let Some(days) = edit.lifespan_days {
        check_lifespan(days)?;
    }
    if let Some(threshold) = edit.low_stock_threshold {
        check_threshold(threshold)?;
    }

    let conn = db.lock()?;
    let changed = conn.execute(
        "UPDATE products SET
            name = COALESCE(?1, name),
            category = COALESCE(?2, category),
            price = COALESCE(?3, price),
            supplier = COALESCE(?4, supplier),
            lifespan_days = COALESCE(?5, lifespan_days),
            low_stock_threshold = COALESCE(?6, low_stock_threshold)
         WHERE id = ?7",
        params![
            name,
            edit.category.as_deref().map(str::trim),
            edit.price,
            edit.supplier,
            edit.lifespan_days,
            edit.low_stock_threshold,
            id
        ],
    )?;

    if changed == 0 {
        return Err(LedgerError::ProductNotFound(id));
    }

    tracing::info!(product_id = id, "product details updated");
    require_product(&conn, id)
}

pub fn get_low_stock(db: &Database) -> Result<Vec<Product>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products
         WHERE quantity <= low_stock_threshold
         ORDER BY quantity ASC, name"
    ))?;
    let products = stmt
        .query_map([], product_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(products)
}

fn check_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(LedgerError::InvalidAmount(format!(
            "price must be a non-negative number, got {price}"
        )));
    }
    Ok(())
}

fn check_lifespan(days: i64) -> Result<()> {
    if days < 0 {
        return Err(LedgerError::Validation(format!(
            "lifespan must be zero or more days, got {days}"
        )));
    }
    Ok(())
}

fn check_threshold(threshold: i64) -> Result<()> {
    if threshold < 0 {
        return Err(LedgerError::Validation(format!(
            "low stock threshold must be zero or more, got {threshold}"
        )));
    }
    Ok(())
}
