//! Crawl orchestrator - main pagination loop
//!
//! This module drives a crawl from its start URL to completion:
//! - Fetching each listing page in turn
//! - Extracting the cards and the next-page link
//! - Validating, deduplicating and persisting every card
//! - Counting what was saved and why the rest was skipped
//! - Sleeping between pages

use crate::config::{Config, CrawlerConfig};
use crate::crawler::dedup::DedupGuard;
use crate::crawler::extractor::CardExtractor;
use crate::crawler::fetcher::PageFetcher;
use crate::record::{CandidateRecord, PersistableRecord};
use crate::state::{CrawlPhase, CrawlState, CrawlSummary, SkipReason};
use crate::storage::{RecordSink, SinkError};
use crate::HarvestError;
use std::time::Duration;

/// When to stop and how fast to go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Stop once this many records were saved
    pub min_saved: u64,

    /// Pause between consecutive listing pages
    pub page_delay: Duration,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self::from(&CrawlerConfig::default())
    }
}

impl From<&CrawlerConfig> for CrawlSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            min_saved: u64::from(config.min_saved),
            page_delay: Duration::from_millis(config.page_delay_ms),
        }
    }
}

/// What happened to one card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardOutcome {
    Saved,
    Skipped(SkipReason),
}

/// Main crawl orchestrator
///
/// Strictly sequential: one page in flight, one card at a time. The sink
/// is only ever touched from here.
pub struct Orchestrator<S: RecordSink> {
    fetcher: PageFetcher,
    extractor: CardExtractor,
    sink: S,
    settings: CrawlSettings,
}

impl<S: RecordSink> Orchestrator<S> {
    pub fn new(fetcher: PageFetcher, sink: S, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            extractor: CardExtractor::default(),
            sink,
            settings,
        }
    }

    /// Builds the fetcher and settings from configuration
    pub fn from_config(config: &Config, sink: S) -> Result<Self, HarvestError> {
        let fetcher = PageFetcher::new(&config.fetcher)?;
        Ok(Self::new(
            fetcher,
            sink,
            CrawlSettings::from(&config.crawler),
        ))
    }

    /// Replaces the default listing page selectors
    pub fn with_extractor(mut self, extractor: CardExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Runs the crawl from `start_url` until the target or the last page
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - Saved and skipped counts
    /// * `Err(HarvestError)` - A page could not be fetched, or the sink broke
    pub async fn run(&mut self, start_url: &str) -> Result<CrawlSummary, HarvestError> {
        tracing::info!(
            "Starting crawl at {} (target: {} records)",
            start_url,
            self.settings.min_saved
        );

        let mut state = CrawlState::new(start_url);
        let start_time = std::time::Instant::now();

        match self.run_pages(&mut state).await {
            Ok(()) => {
                let summary = state.summary();
                tracing::info!("Crawl completed in {:?}: {}", start_time.elapsed(), summary);
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(
                    "Crawl aborted in phase {} after saving {} records: {}",
                    state.phase(),
                    state.saved,
                    e
                );
                Err(e)
            }
        }
    }

    async fn run_pages(&mut self, state: &mut CrawlState) -> Result<(), HarvestError> {
        let target = self.settings.min_saved;
        let mut pages = 0u64;

        loop {
            let page_url = match state.current_url.clone() {
                Some(url) if state.below_target(target) => url,
                _ => return state.transition(CrawlPhase::Done),
            };

            state.transition(CrawlPhase::FetchingPage)?;
            let body = match self.fetcher.fetch(&page_url).await {
                Ok(body) => body,
                Err(e) => {
                    state.transition(CrawlPhase::Failed)?;
                    return Err(e.into());
                }
            };
            pages += 1;

            state.transition(CrawlPhase::ExtractingCards)?;
            let page = self.extractor.extract(&body, &page_url);
            tracing::debug!(
                "Page {} ({}): {} cards",
                pages,
                page_url,
                page.candidates.len()
            );

            state.transition(CrawlPhase::ProcessingCards)?;
            if let Err(e) = self.process_cards(state, &page_url, &page.candidates) {
                state.transition(CrawlPhase::Failed)?;
                return Err(e.into());
            }

            tracing::info!(
                "Processed page {}: {} saved, {} skipped so far",
                pages,
                state.saved,
                state.skipped
            );

            state.transition(CrawlPhase::Paginating)?;
            state.current_url = page.next_page_url;

            if !state.should_continue(target) {
                return state.transition(CrawlPhase::Done);
            }

            if !self.settings.page_delay.is_zero() {
                tokio::time::sleep(self.settings.page_delay).await;
            }
            state.transition(CrawlPhase::AwaitingPage)?;
        }
    }

    /// Handles the cards of one page, stopping early at the target
    ///
    /// Only an unusable sink escapes as an error.
    fn process_cards(
        &mut self,
        state: &mut CrawlState,
        page_url: &str,
        candidates: &[CandidateRecord],
    ) -> Result<(), SinkError> {
        for candidate in candidates {
            if !state.below_target(self.settings.min_saved) {
                tracing::debug!("Target of {} records reached", self.settings.min_saved);
                break;
            }

            match self.process_card(candidate, page_url)? {
                CardOutcome::Saved => state.record_saved(),
                CardOutcome::Skipped(reason) => state.record_skip(reason),
            }
        }
        Ok(())
    }

    fn process_card(
        &mut self,
        candidate: &CandidateRecord,
        page_url: &str,
    ) -> Result<CardOutcome, SinkError> {
        let resolved = candidate.resolve(page_url);

        if let Err(e) = resolved.validate() {
            tracing::debug!("Broken card on {} ({}): {:?}", page_url, e, candidate.title);
            return Ok(CardOutcome::Skipped(SkipReason::Broken));
        }

        match DedupGuard::new(&self.sink).exists(&resolved.product_url) {
            Ok(true) => {
                tracing::debug!("Already stored: {}", resolved.product_url);
                return Ok(CardOutcome::Skipped(SkipReason::Duplicate));
            }
            Ok(false) => {}
            Err(e) => return skip_or_abort(e, &resolved.product_url),
        }

        let record = PersistableRecord::from_candidate(resolved);
        match self.sink.save(&record) {
            Ok(()) => {
                tracing::debug!("Saved {} ({})", record.product_url, record.price);
                Ok(CardOutcome::Saved)
            }
            Err(e) => skip_or_abort(e, &record.product_url),
        }
    }
}

/// Turns a sink failure for one record into a skip, unless it is fatal
fn skip_or_abort(error: SinkError, product_url: &str) -> Result<CardOutcome, SinkError> {
    match error {
        SinkError::DuplicateKey(_) => {
            tracing::debug!("Sink rejected duplicate {}", product_url);
            Ok(CardOutcome::Skipped(SkipReason::Duplicate))
        }
        SinkError::Transient(_) => {
            tracing::warn!("Skipped {}: {}", product_url, error);
            Ok(CardOutcome::Skipped(SkipReason::Error))
        }
        SinkError::Unusable(_) => Err(error),
    }
}
