//! Shelf-Harvest: a polite catalog importer
//!
//! This crate walks the paginated listing pages of a catalog site, extracts
//! product cards, skips records that were already stored and commits the
//! rest to a record sink, retrying rate-limited or failing requests with
//! exponential backoff.

pub mod config;
pub mod crawler;
pub mod record;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Shelf-Harvest operations
///
/// Every variant is fatal for the crawl it escapes from: per-record problems
/// are classified and counted inside the orchestrator and never reach here.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Record sink failed: {0}")]
    Sink(#[from] storage::SinkError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid crawl transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Shelf-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Orchestrator};
pub use record::{normalize_price, CandidateRecord, PersistableRecord, Price};
pub use state::{CrawlPhase, CrawlState, CrawlSummary, SkipReason};
pub use storage::{RecordSink, SinkError, SqliteSink};
pub use url::resolve_url;
