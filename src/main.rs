//! Shelf-Harvest main entry point
//!
//! This is the command-line interface for the Shelf-Harvest catalog importer.

use clap::Parser;
use shelf_harvest::config::{load_config, validate, Config};
use shelf_harvest::crawler::crawl;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Shelf-Harvest: a polite catalog importer
///
/// Walks the listing pages of a catalog category, stores every product
/// card it has not seen before, and stops once enough new records were
/// saved or the last page was reached.
#[derive(Parser, Debug)]
#[command(name = "shelf-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite catalog importer", long_about = None)]
struct Cli {
    /// First listing page, e.g. https://books.toscrape.com/catalogue/category/books/travel_2/index.html
    #[arg(value_name = "CATEGORY_URL")]
    category_url: String,

    /// Minimum number of new records to save before stopping [default: 10]
    #[arg(long, value_name = "N")]
    min: Option<u32>,

    /// Delay between listing pages in milliseconds [default: 600]
    #[arg(long, value_name = "MS")]
    delay: Option<u64>,

    /// Path to a TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database to store records in (overrides the config file)
    #[arg(long, value_name = "PATH")]
    database: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e);
        }
    };

    tracing::info!(
        "Target: {} records, page delay: {}ms, database: {}",
        config.crawler.min_saved,
        config.crawler.page_delay_ms,
        config.output.database_path
    );

    match crawl(&config, &cli.category_url).await {
        Ok(summary) => {
            println!("✓ {}", summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Loads the config file (if any) and applies command-line overrides
fn build_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)?
        }
        None => Config::default(),
    };

    if let Some(min) = cli.min {
        config.crawler.min_saved = min;
    }
    if let Some(delay) = cli.delay {
        config.crawler.page_delay_ms = delay;
    }
    if let Some(database) = &cli.database {
        config.output.database_path = database.clone();
    }

    validate(&config)?;
    Ok(config)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_harvest=info,warn"),
            1 => EnvFilter::new("shelf_harvest=debug,info"),
            2 => EnvFilter::new("shelf_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
