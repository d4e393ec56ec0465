//! Listing page extraction
//!
//! This module reads product cards and the next-page link out of a listing
//! page. The extraction logic only talks to the [`MarkupNode`] capability,
//! so the HTML library behind it can change without touching the crawl.

use crate::record::CandidateRecord;
use crate::url::resolve_url;
use scraper::{ElementRef, Html, Selector};

/// What the extractor needs from a parsed markup tree
pub trait MarkupNode: Sized {
    /// All descendants matching a CSS selector, in document order
    fn locate(&self, selector: &str) -> Vec<Self>;

    /// The value of an attribute on this node
    fn attr(&self, name: &str) -> Option<String>;

    /// The concatenated text content of this node
    fn text(&self) -> String;
}

/// [`MarkupNode`] backed by the `scraper` crate
#[derive(Debug, Clone, Copy)]
pub struct ScraperNode<'a>(ElementRef<'a>);

impl<'a> ScraperNode<'a> {
    pub fn new(element: ElementRef<'a>) -> Self {
        Self(element)
    }
}

impl<'a> MarkupNode for ScraperNode<'a> {
    fn locate(&self, selector: &str) -> Vec<Self> {
        match Selector::parse(selector) {
            Ok(selector) => self.0.select(&selector).map(ScraperNode).collect(),
            Err(e) => {
                tracing::warn!("Invalid selector '{}': {:?}", selector, e);
                Vec::new()
            }
        }
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.0.value().attr(name).map(str::to_string)
    }

    fn text(&self) -> String {
        self.0.text().collect()
    }
}

/// CSS selectors locating the fields of a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSelectors {
    /// One product summary block
    pub card: String,
    /// Link carrying the title attribute and the detail-page href
    pub title_link: String,
    pub price: String,
    pub availability: String,
    pub image: String,
    /// Link to the following listing page
    pub next_link: String,
}

impl Default for CardSelectors {
    fn default() -> Self {
        Self {
            card: ".product_pod".to_string(),
            title_link: "h3 a".to_string(),
            price: ".price_color".to_string(),
            availability: ".availability".to_string(),
            image: ".image_container img".to_string(),
            next_link: ".next a".to_string(),
        }
    }
}

/// Cards and pagination read from one listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Candidates in document order
    pub candidates: Vec<CandidateRecord>,

    /// Absolute URL of the next page, `None` on the last page
    pub next_page_url: Option<String>,
}

/// Turns listing page markup into candidate records
#[derive(Debug, Clone, Default)]
pub struct CardExtractor {
    selectors: CardSelectors,
}

impl CardExtractor {
    pub fn new(selectors: CardSelectors) -> Self {
        Self { selectors }
    }

    /// Parses `content` as HTML and extracts its cards
    ///
    /// Pure: the same content and URL always give the same result.
    ///
    /// # Example
    ///
    /// ```
    /// use shelf_harvest::crawler::CardExtractor;
    ///
    /// let html = r#"<article class="product_pod">
    ///     <h3><a href="book_1/index.html" title="Book One">Book One</a></h3>
    ///     <p class="price_color">£10.00</p>
    /// </article>
    /// <li class="next"><a href="page-2.html">next</a></li>"#;
    ///
    /// let page = CardExtractor::default().extract(html, "https://books.example/list/index.html");
    /// assert_eq!(page.candidates.len(), 1);
    /// assert_eq!(page.candidates[0].title, "Book One");
    /// assert_eq!(page.next_page_url.as_deref(), Some("https://books.example/list/page-2.html"));
    /// ```
    pub fn extract(&self, content: &str, page_url: &str) -> ExtractedPage {
        let document = Html::parse_document(content);
        self.extract_from(&ScraperNode::new(document.root_element()), page_url)
    }

    /// Extracts cards from an already parsed tree
    pub fn extract_from<N: MarkupNode>(&self, root: &N, page_url: &str) -> ExtractedPage {
        let candidates = root
            .locate(&self.selectors.card)
            .iter()
            .map(|card| self.read_card(card))
            .collect();

        let next_page_url = first(root, &self.selectors.next_link)
            .and_then(|link| link.attr("href"))
            .map(|href| resolve_url(page_url, &href))
            .filter(|url| !url.is_empty());

        ExtractedPage {
            candidates,
            next_page_url,
        }
    }

    fn read_card<N: MarkupNode>(&self, card: &N) -> CandidateRecord {
        let title_link = first(card, &self.selectors.title_link);

        CandidateRecord {
            title: title_link
                .as_ref()
                .and_then(|link| link.attr("title"))
                .map(|title| collapse_whitespace(&title))
                .unwrap_or_default(),
            price_raw: first_text(card, &self.selectors.price),
            stock_text: first_text(card, &self.selectors.availability),
            href: title_link
                .as_ref()
                .and_then(|link| link.attr("href"))
                .unwrap_or_default(),
            image_href: first(card, &self.selectors.image)
                .and_then(|img| img.attr("src"))
                .filter(|src| !src.trim().is_empty()),
        }
    }
}

fn first<N: MarkupNode>(node: &N, selector: &str) -> Option<N> {
    node.locate(selector).into_iter().next()
}

fn first_text<N: MarkupNode>(node: &N, selector: &str) -> String {
    first(node, selector)
        .map(|found| collapse_whitespace(&found.text()))
        .unwrap_or_default()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
