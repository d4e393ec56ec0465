//! Crawl phase definitions for tracking orchestrator progress

use std::fmt;

/// Represents where the orchestrator is in its pagination loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    // ===== Active Phases =====
    /// Deciding whether another page should be fetched
    AwaitingPage,

    /// A listing page request (with retries) is in flight
    FetchingPage,

    /// Cards and the next-page link are being read from the page
    ExtractingCards,

    /// Candidates are being validated, deduplicated and persisted
    ProcessingCards,

    /// Resolving the next page and applying the politeness delay
    Paginating,

    // ===== Terminal Phases =====
    /// Pagination exhausted or the save target was reached
    Done,

    /// An unrecoverable fetch or sink failure ended the crawl
    Failed,
}

impl CrawlPhase {
    /// Returns true if the crawl cannot continue from this phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        use CrawlPhase::*;

        matches!(
            (self, next),
            (AwaitingPage, FetchingPage)
                | (AwaitingPage, Done)
                | (FetchingPage, ExtractingCards)
                | (FetchingPage, Failed)
                | (ExtractingCards, ProcessingCards)
                | (ProcessingCards, Paginating)
                | (ProcessingCards, Failed)
                | (Paginating, AwaitingPage)
                | (Paginating, Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingPage => "awaiting_page",
            Self::FetchingPage => "fetching_page",
            Self::ExtractingCards => "extracting_cards",
            Self::ProcessingCards => "processing_cards",
            Self::Paginating => "paginating",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
