//! SQLite record sink
//!
//! This module provides a SQLite-based implementation of the RecordSink trait.

use crate::record::{PersistableRecord, Price};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordSink, SinkError, SinkResult, StoredRecord};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteSink {
    conn: Connection,
    /// Set once the connection has reported it cannot be used anymore
    unusable: Option<String>,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path` and initializes its schema
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteSink)` - Successfully opened/created database
    /// * `Err(SinkError::Unusable)` - Failed to open or initialize the database
    pub fn open(path: &Path) -> SinkResult<Self> {
        let conn = Connection::open(path).map_err(|e| open_failure(path, e))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(|e| open_failure(path, e))?;

        initialize_schema(&conn).map_err(|e| open_failure(path, e))?;

        tracing::debug!("Opened record database at {}", path.display());

        Ok(Self {
            conn,
            unusable: None,
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SinkError::Unusable(format!("in-memory database: {}", e)))?;
        initialize_schema(&conn)
            .map_err(|e| SinkError::Unusable(format!("in-memory database: {}", e)))?;
        Ok(Self {
            conn,
            unusable: None,
        })
    }

    /// Counts all stored records
    pub fn count_records(&self) -> SinkResult<u64> {
        self.ensure_usable()?;
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
            .map_err(|e| classify_error(e, None))?;
        Ok(count.max(0) as u64)
    }

    /// Returns every stored record in insertion order
    pub fn all_records(&self) -> SinkResult<Vec<StoredRecord>> {
        self.ensure_usable()?;
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, title, price_cents, in_stock, product_url, image_url, created_at
                 FROM books ORDER BY id",
            )
            .map_err(|e| classify_error(e, None))?;

        let records = stmt
            .query_map([], record_from_row)
            .map_err(|e| classify_error(e, None))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| classify_error(e, None))?;

        Ok(records)
    }

    fn ensure_usable(&self) -> SinkResult<()> {
        match &self.unusable {
            Some(reason) => Err(SinkError::Unusable(reason.clone())),
            None => Ok(()),
        }
    }

    /// Remembers a fatal error so later calls fail fast
    fn track(&mut self, result: SinkResult<()>) -> SinkResult<()> {
        if let Err(SinkError::Unusable(reason)) = &result {
            self.unusable = Some(reason.clone());
        }
        result
    }

    /// Inserts one record inside its own transaction
    ///
    /// The transaction is rolled back when dropped without a commit, so
    /// every early return below leaves the connection clean.
    fn insert(&mut self, record: &PersistableRecord) -> SinkResult<()> {
        let url = Some(record.product_url.as_str());

        let tx = self
            .conn
            .transaction()
            .map_err(|e| classify_error(e, url))?;

        tx.execute(
            "INSERT INTO books (title, price_cents, in_stock, product_url, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.title,
                record.price.cents(),
                record.in_stock,
                record.product_url,
                record.image_url,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| classify_error(e, url))?;

        tx.commit().map_err(|e| classify_error(e, url))
    }
}

impl RecordSink for SqliteSink {
    fn find_by_product_url(&self, product_url: &str) -> SinkResult<Option<StoredRecord>> {
        self.ensure_usable()?;

        self.conn
            .query_row(
                "SELECT id, title, price_cents, in_stock, product_url, image_url, created_at
                 FROM books WHERE product_url = ?1",
                params![product_url],
                record_from_row,
            )
            .optional()
            .map_err(|e| classify_error(e, Some(product_url)))
    }

    fn save(&mut self, record: &PersistableRecord) -> SinkResult<()> {
        self.ensure_usable()?;
        let result = self.insert(record);
        self.track(result)
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<StoredRecord> {
    let created_at: String = row.get(6)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?;

    Ok(StoredRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        price: Price::from_cents(row.get(2)?),
        in_stock: row.get(3)?,
        product_url: row.get(4)?,
        image_url: row.get(5)?,
        created_at,
    })
}

fn open_failure(path: &Path, err: rusqlite::Error) -> SinkError {
    SinkError::Unusable(format!("{}: {}", path.display(), err))
}

/// Maps a rusqlite error onto the sink's transient/fatal split
///
/// | SQLite condition | SinkError |
/// |------------------|-----------|
/// | UNIQUE constraint | DuplicateKey |
/// | cannot open, not a database, corrupt, I/O, read-only, permission, disk full, misuse | Unusable |
/// | anything else (busy, locked, other constraints, type errors) | Transient |
pub(crate) fn classify_error(err: rusqlite::Error, product_url: Option<&str>) -> SinkError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            if let Some(url) = product_url {
                return SinkError::DuplicateKey(url.to_string());
            }
        }

        match failure.code {
            ErrorCode::CannotOpen
            | ErrorCode::NotADatabase
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::SystemIoFailure
            | ErrorCode::ReadOnly
            | ErrorCode::PermissionDenied
            | ErrorCode::DiskFull
            | ErrorCode::ApiMisuse => return SinkError::Unusable(err.to_string()),
            _ => {}
        }
    }

    SinkError::Transient(err.to_string())
}
