//! The archived article record.
//!
//! An [`Article`] is built once per render and parse pass, handed to the
//! archive writer and dropped. The archive file is the only durable copy.
//!
//! # JSON Shape
//!
//! ```json
//! {
//!     "title": "Stocks rally as inflation cools",
//!     "url": "https://finance.yahoo.com/news/stocks-rally-123.html",
//!     "date": "2025-05-06T14:30:00.000Z",
//!     "author": "Jane Doe",
//!     "source": "finance.yahoo.com",
//!     "content_snippet": "Stocks rose 3.5% ...",
//!     "full_content": "Stocks rose 3.5% on Tuesday.\nThe Fed held rates.",
//!     "tags": ["ACR:Fed", "PCT:3.5"]
//! }
//! ```
//!
//! A missing title or author is written as the `"Not Found"` sentinel but is
//! held as `None` in memory. A publish date that had to be backfilled from the
//! clock carries `"date_is_fallback": true`.

use serde::{Deserialize, Serialize};

/// Placeholder written for fields the page did not provide.
pub const NOT_FOUND: &str = "Not Found";

/// Maximum number of characters kept in [`Article::content_snippet`].
pub const SNIPPET_CHARS: usize = 200;

/// A parsed news article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Headline text, `None` when the page had no title element.
    #[serde(with = "sentinel")]
    pub title: Option<String>,
    /// Canonical article URL with the query string removed.
    pub url: String,
    /// ISO 8601 publish timestamp, verbatim from the page when available.
    #[serde(rename = "date")]
    pub published_at: String,
    /// Set when `published_at` is the extraction time rather than a value
    /// read from the page.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub date_is_fallback: bool,
    #[serde(with = "sentinel")]
    pub author: Option<String>,
    /// Full name of the origin site, e.g. `finance.yahoo.com`.
    pub source: String,
    pub content_snippet: String,
    /// Body paragraphs joined by newlines. Never empty.
    pub full_content: String,
    /// Sorted, deduplicated entity tags.
    pub tags: Vec<String>,
}

/// Leading part of `content`, at most [`SNIPPET_CHARS`] characters followed by
/// `...` when anything was cut.
pub fn snippet(content: &str) -> String {
    match content.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

mod sentinel {
    use super::NOT_FOUND;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(NOT_FOUND))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.filter(|v| v != NOT_FOUND))
    }
}
