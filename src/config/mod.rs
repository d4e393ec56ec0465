//! Configuration module for Shelf-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Command-line flags are applied on top of whatever the file provides.
//!
//! # Example
//!
//! ```no_run
//! use shelf_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Inter-page delay: {}ms", config.crawler.page_delay_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FetcherConfig, OutputConfig, DEFAULT_USER_AGENTS};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::{validate, validate_start_url};
