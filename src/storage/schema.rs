//! Database schema definitions
//!
//! This module contains the SQL schema for the Shelf-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Imported catalog records, keyed by product page URL
CREATE TABLE IF NOT EXISTS books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    price_cents INTEGER NOT NULL CHECK (price_cents >= 0),
    in_stock INTEGER NOT NULL,
    product_url TEXT NOT NULL UNIQUE,
    image_url TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_books_price ON books(price_cents);
CREATE INDEX IF NOT EXISTS idx_books_in_stock ON books(in_stock);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
