use crate::error::{LedgerError, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Database {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Run `f` inside an immediate (write-locking) transaction. The
    /// transaction commits only when `f` returns `Ok`; any error rolls back
    /// every statement `f` executed.
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            -- Sellable stock, one row per product
            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                category TEXT NOT NULL DEFAULT '',
                price REAL NOT NULL,
                quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
                supplier TEXT,
                date_received DATE NOT NULL,
                lifespan_days INTEGER NOT NULL,
                low_stock_threshold INTEGER NOT NULL DEFAULT 5,
                created_at DATETIME NOT NULL
            );

            -- Sale journal; rows are append-only
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                transaction_type TEXT NOT NULL,
                items TEXT NOT NULL,
                subtotal REAL NOT NULL,
                discount_amount REAL NOT NULL DEFAULT 0,
                total_amount REAL NOT NULL,
                payment_method TEXT NOT NULL,
                event_details TEXT,
                created_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_created_at ON transactions(created_at);

            CREATE TRIGGER IF NOT EXISTS transactions_no_update
            BEFORE UPDATE ON transactions
            BEGIN
                SELECT RAISE(ABORT, 'transactions are append-only');
            END;

            CREATE TRIGGER IF NOT EXISTS transactions_no_delete
            BEFORE DELETE ON transactions
            BEGIN
                SELECT RAISE(ABORT, 'transactions are append-only');
            END;

            -- Scheduled events; products and payments are JSON documents
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_name TEXT NOT NULL,
                contact_number TEXT,
                email TEXT,
                venue TEXT,
                notes TEXT,
                event_date DATE NOT NULL,
                products TEXT NOT NULL DEFAULT '[]',
                payment_history TEXT NOT NULL DEFAULT '[]',
                total_amount REAL NOT NULL DEFAULT 0,
                total_paid REAL NOT NULL DEFAULT 0,
                remaining_balance REAL NOT NULL DEFAULT 0,
                status TEXT NOT NULL DEFAULT 'Pending',
                created_at DATETIME NOT NULL,
                updated_at DATETIME NOT NULL
            );

            -- Expired stock moved out of the sellable ledger
            CREATE TABLE IF NOT EXISTS spoiled_lots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                quantity_spoiled INTEGER NOT NULL,
                supplier TEXT,
                date_received DATE NOT NULL,
                expired_on DATE NOT NULL,
                date_spoiled DATE NOT NULL,
                FOREIGN KEY (product_id) REFERENCES products(id)
            );
            ",
        )?;

        // Run migrations for existing databases (pass connection to avoid deadlock)
        Self::migrate_conn(&conn)?;

        tracing::debug!("database schema ready");
        Ok(())
    }

    fn migrate_conn(conn: &Connection) -> Result<()> {
        let product_columns = table_columns(conn, "products")?;
        if !product_columns.iter().any(|c| c == "low_stock_threshold") {
            conn.execute(
                "ALTER TABLE products ADD COLUMN low_stock_threshold INTEGER NOT NULL DEFAULT 5",
                [],
            )?;
        }

        // Optimistic version counter for event writes
        let event_columns = table_columns(conn, "events")?;
        if !event_columns.iter().any(|c| c == "version") {
            conn.execute(
                "ALTER TABLE events ADD COLUMN version INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
        }

        Ok(())
    }
}

/// Decode a JSON text column.
pub(crate) fn json_column<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Decode a nullable JSON text column.
pub(crate) fn json_column_opt<T: DeserializeOwned>(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|text| {
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Decode a text column holding one of an enum's stored labels.
pub(crate) fn label_column<T>(
    row: &Row<'_>,
    idx: usize,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    parse(&text).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown label {text:?}").into(),
        )
    })
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let columns = conn
        .prepare(&format!("PRAGMA table_info({table})"))?
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_is_repeatable() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db.initialize().unwrap();

        let conn = db.lock().unwrap();
        let columns = table_columns(&conn, "events").unwrap();
        assert!(columns.contains(&"version".to_string()));
    }

    #[test]
    fn unusable_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let result = Database::open(blocker.join("shop.db"));
        assert!(matches!(result, Err(LedgerError::Io(_))));
    }

    #[test]
    fn quantity_check_rejects_negative_stock() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();

        let conn = db.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO products (name, price, quantity, date_received, lifespan_days, created_at)
             VALUES ('Rose', 2.5, -1, '2026-01-01', 7, '2026-01-01 00:00:00')",
            [],
        );
        assert!(result.is_err(), "Should not allow negative quantity");
    }
}
