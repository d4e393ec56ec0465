//! Storage module for persisting harvested records
//!
//! This module handles all database operations for the crawler, including:
//! - The `RecordSink` boundary the orchestrator writes through
//! - SQLite database initialization and schema management
//! - Mapping database failures onto transient vs. fatal sink errors

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteSink;
pub use traits::{RecordSink, SinkError, SinkResult, StoredRecord};

use std::path::Path;

/// Opens a SQLite record sink, creating the database if needed
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_sink(path: &Path) -> SinkResult<SqliteSink> {
    SqliteSink::open(path)
}
