//! Crawler module for listing page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry, backoff and User-Agent rotation
//! - Card extraction from listing page HTML
//! - Duplicate checks against the record sink
//! - Overall crawl orchestration

mod dedup;
mod extractor;
mod fetcher;
mod orchestrator;

pub use dedup::DedupGuard;
pub use extractor::{CardExtractor, CardSelectors, ExtractedPage, MarkupNode, ScraperNode};
pub use fetcher::{
    build_http_client, AttemptOutcome, FetchError, PageFetcher, RetryPolicy, RetryReason,
};
pub use orchestrator::{CrawlSettings, Orchestrator};

use crate::config::{validate_start_url, Config};
use crate::state::CrawlSummary;
use crate::storage::open_sink;
use crate::HarvestError;
use std::path::Path;

/// Runs a complete crawl into the configured SQLite database
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Validate the start URL
/// 2. Open the record database
/// 3. Build the HTTP client
/// 4. Walk the listing pages until the target or the last page
/// 5. Return the saved/skipped summary
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `start_url` - The first listing page
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl completed successfully
/// * `Err(HarvestError)` - Crawl failed
///
/// # Example
///
/// ```no_run
/// use shelf_harvest::config::Config;
/// use shelf_harvest::crawler::crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let summary = crawl(&Config::default(), "https://books.toscrape.com/index.html").await?;
/// println!("{}", summary);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &Config, start_url: &str) -> Result<CrawlSummary, HarvestError> {
    let start = validate_start_url(start_url)?;
    let sink = open_sink(Path::new(&config.output.database_path))?;

    let mut orchestrator = Orchestrator::from_config(config, sink)?;
    orchestrator.run(start.as_str()).await
}
