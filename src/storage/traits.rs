//! Record sink trait and error types
//!
//! This module defines the persistence boundary the crawl writes to.

use crate::record::{PersistableRecord, Price};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while talking to a record sink
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The product URL is already stored; nothing was written
    #[error("Duplicate product URL: {0}")]
    DuplicateKey(String),

    /// This record could not be stored, later records may still succeed
    #[error("Transient storage failure: {0}")]
    Transient(String),

    /// The underlying store can no longer be used
    #[error("Storage unusable: {0}")]
    Unusable(String),
}

impl SinkError {
    /// Returns true if the crawl must stop after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unusable(_))
    }
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// A record as read back from the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: i64,
    pub title: String,
    pub price: Price,
    pub in_stock: bool,
    pub product_url: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Trait for record storage backends
///
/// The product URL is the natural key. Implementations must enforce its
/// uniqueness themselves: the crawl checks for existence before saving,
/// but that check is only a pre-flight and a concurrent writer could slip
/// in between the two calls.
pub trait RecordSink {
    /// Looks up a stored record by its product URL
    fn find_by_product_url(&self, product_url: &str) -> SinkResult<Option<StoredRecord>>;

    /// Stores one record as a self-contained unit of work
    ///
    /// Nothing from a failed call may linger and affect the next one.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The record was committed
    /// * `Err(SinkError::DuplicateKey)` - The product URL already exists
    /// * `Err(SinkError::Transient)` - This record failed, keep going
    /// * `Err(SinkError::Unusable)` - The sink is broken, stop
    fn save(&mut self, record: &PersistableRecord) -> SinkResult<()>;
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn find_by_product_url(&self, product_url: &str) -> SinkResult<Option<StoredRecord>> {
        (**self).find_by_product_url(product_url)
    }

    fn save(&mut self, record: &PersistableRecord) -> SinkResult<()> {
        (**self).save(record)
    }
}
