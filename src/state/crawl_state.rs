//! Per-invocation crawl bookkeeping
//!
//! The orchestrator owns exactly one [`CrawlState`] for the lifetime of a
//! crawl. Nothing here is persisted: the final [`CrawlSummary`] is reported
//! and the state is dropped.

use crate::state::CrawlPhase;
use crate::HarvestError;
use std::collections::HashMap;
use std::fmt;

/// Why a candidate was not saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SkipReason {
    /// The product URL is already stored
    Duplicate,

    /// Title, price text or product URL was missing
    Broken,

    /// The sink failed to store this one record
    Error,
}

impl SkipReason {
    /// All reasons, in reporting order
    pub const ALL: [SkipReason; 3] = [Self::Duplicate, Self::Broken, Self::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Broken => "broken",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutable state of one crawl
#[derive(Debug, Clone)]
pub struct CrawlState {
    /// Next listing page to fetch, `None` once pagination is exhausted
    pub current_url: Option<String>,
    pub saved: u64,
    pub skipped: u64,
    skip_reasons: HashMap<SkipReason, u64>,
    phase: CrawlPhase,
}

impl CrawlState {
    pub fn new(start_url: impl Into<String>) -> Self {
        Self {
            current_url: Some(start_url.into()),
            saved: 0,
            skipped: 0,
            skip_reasons: SkipReason::ALL.iter().map(|reason| (*reason, 0)).collect(),
            phase: CrawlPhase::AwaitingPage,
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Moves to `next`, rejecting transitions the state machine does not allow
    pub fn transition(&mut self, next: CrawlPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::trace!("Crawl phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }

    /// True while the save target has not been met
    pub fn below_target(&self, target: u64) -> bool {
        self.saved < target
    }

    /// True while there is a page to fetch and the target has not been met
    pub fn should_continue(&self, target: u64) -> bool {
        self.current_url.is_some() && self.below_target(target)
    }

    pub fn record_saved(&mut self) {
        self.saved += 1;
    }

    pub fn record_skip(&mut self, reason: SkipReason) {
        self.skipped += 1;
        *self.skip_reasons.entry(reason).or_insert(0) += 1;
    }

    pub fn skip_count(&self, reason: SkipReason) -> u64 {
        self.skip_reasons.get(&reason).copied().unwrap_or(0)
    }

    pub fn summary(&self) -> CrawlSummary {
        CrawlSummary {
            saved: self.saved,
            skipped: self.skipped,
            duplicate: self.skip_count(SkipReason::Duplicate),
            broken: self.skip_count(SkipReason::Broken),
            error: self.skip_count(SkipReason::Error),
        }
    }
}

/// Final counts reported when a crawl completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrawlSummary {
    pub saved: u64,
    pub skipped: u64,
    pub duplicate: u64,
    pub broken: u64,
    pub error: u64,
}

impl CrawlSummary {
    pub fn reason_count(&self, reason: SkipReason) -> u64 {
        match reason {
            SkipReason::Duplicate => self.duplicate,
            SkipReason::Broken => self.broken,
            SkipReason::Error => self.error,
        }
    }
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Saved: {}, skipped: {} (reasons: ",
            self.saved, self.skipped
        )?;
        for (i, reason) in SkipReason::ALL.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", reason, self.reason_count(*reason))?;
        }
        write!(f, ")")
    }
}
