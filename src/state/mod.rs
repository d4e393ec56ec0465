//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: Where the orchestrator is in its fetch/extract/process/paginate cycle
//! - `CrawlState`: Current page, saved/skipped counters and skip reasons for one crawl
//! - `CrawlSummary`: The counts reported once the crawl is done

mod crawl_state;
mod phase;

// Re-export main types
pub use crawl_state::{CrawlState, CrawlSummary, SkipReason};
pub use phase::CrawlPhase;
