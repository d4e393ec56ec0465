//! URL handling module for Shelf-Harvest
//!
//! Listing pages link to product pages, thumbnails and the next page with
//! relative hrefs. This module turns those into absolute URLs.

mod resolve;

pub use resolve::resolve_url;
