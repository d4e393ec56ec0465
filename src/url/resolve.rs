//! Link resolution against a listing page URL

use url::Url;

/// Resolves a possibly-relative link against the page it was found on
///
/// # Resolution Rules
///
/// 1. Empty (or whitespace-only) links resolve to `""`, which callers treat
///    as a missing link
/// 2. Links that already start with `http` are returned verbatim, without
///    any validation
/// 3. Everything else is joined onto `base` after the base's query and
///    fragment have been dropped, using standard URL reference resolution
///    (last path segment replaced, `.`/`..` segments removed)
///
/// A base that cannot be parsed, or a join that fails, also yields `""`.
///
/// # Examples
///
/// ```
/// use shelf_harvest::url::resolve_url;
///
/// let base = "https://books.example/catalogue/category/books/index.html?page=1";
/// assert_eq!(
///     resolve_url(base, "../../book_1/index.html"),
///     "https://books.example/catalogue/book_1/index.html"
/// );
/// assert_eq!(resolve_url(base, "http://other.example/p"), "http://other.example/p");
/// ```
pub fn resolve_url(base: &str, relative: &str) -> String {
    let relative = relative.trim();

    if relative.is_empty() {
        return String::new();
    }

    if relative.starts_with("http") {
        return relative.to_string();
    }

    let mut base_url = match Url::parse(base.trim()) {
        Ok(url) => url,
        Err(e) => {
            tracing::debug!("Cannot resolve '{}' against base '{}': {}", relative, base, e);
            return String::new();
        }
    };
    base_url.set_query(None);
    base_url.set_fragment(None);

    match base_url.join(relative) {
        Ok(resolved) => resolved.to_string(),
        Err(e) => {
            tracing::debug!("Failed to join '{}' onto '{}': {}", relative, base_url, e);
            String::new()
        }
    }
}
