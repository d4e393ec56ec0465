//! Record types flowing through a crawl
//!
//! A listing card is read into a [`CandidateRecord`], its links are resolved
//! into a [`ResolvedCandidate`], and once it has passed validation and the
//! duplicate check it becomes a [`PersistableRecord`] handed to the sink.

mod price;

pub use price::{normalize_price, Price};

use crate::url::resolve_url;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Raw, unvalidated data extracted from one listing card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRecord {
    pub title: String,
    pub price_raw: String,
    pub stock_text: String,
    pub href: String,
    pub image_href: Option<String>,
}

impl CandidateRecord {
    /// Resolves the product and image links against the listing page URL
    pub fn resolve(&self, page_url: &str) -> ResolvedCandidate {
        let image_url = self
            .image_href
            .as_deref()
            .map(|href| resolve_url(page_url, href))
            .filter(|url| !url.is_empty());

        ResolvedCandidate {
            title: self.title.clone(),
            price_raw: self.price_raw.clone(),
            stock_text: self.stock_text.clone(),
            product_url: resolve_url(page_url, &self.href),
            image_url,
        }
    }
}

/// Why a candidate cannot be stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing title")]
    MissingTitle,

    #[error("missing price text")]
    MissingPrice,

    #[error("missing product URL")]
    MissingProductUrl,
}

/// A candidate whose links have been made absolute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCandidate {
    pub title: String,
    pub price_raw: String,
    pub stock_text: String,
    /// Empty when the card had no usable link
    pub product_url: String,
    pub image_url: Option<String>,
}

impl ResolvedCandidate {
    /// Checks that title, price text and product URL are all present
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if self.price_raw.trim().is_empty() {
            return Err(ValidationError::MissingPrice);
        }
        if self.product_url.is_empty() {
            return Err(ValidationError::MissingProductUrl);
        }
        Ok(())
    }

    /// True when the availability text mentions "in stock", in any case
    pub fn in_stock(&self) -> bool {
        self.stock_text.to_lowercase().contains("in stock")
    }
}

/// A validated, normalized record ready for storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistableRecord {
    pub title: String,
    pub price: Price,
    pub in_stock: bool,
    /// Absolute product page URL, the natural key
    pub product_url: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PersistableRecord {
    /// Normalizes a validated candidate, stamping it with the current time
    pub fn from_candidate(candidate: ResolvedCandidate) -> Self {
        let price = normalize_price(&candidate.price_raw);
        let in_stock = candidate.in_stock();

        Self {
            title: candidate.title.trim().to_string(),
            price,
            in_stock,
            product_url: candidate.product_url,
            image_url: candidate.image_url,
            created_at: Utc::now(),
        }
    }
}
