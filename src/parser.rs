//! Article page parsing.
//!
//! Turns a rendered article page into an [`Article`]. Each field is located
//! independently with the selectors from the site profile, and a missing
//! element degrades to a fallback rather than failing the whole parse:
//!
//! | Field | Source | Fallback |
//! |-------|--------|----------|
//! | title | first title element, trimmed | `None` |
//! | author | link in byline, else first direct text, else byline text | `None` |
//! | date | `datetime` attribute of the time element | clock time, flagged |
//! | body | non-empty paragraphs in the body container | **invalid** |
//! | tags | body metrics + ticker carousel symbols | empty |
//!
//! The only hard failure is an empty body: no record is ever produced without
//! content.

use crate::clock::Clock;
use crate::discover::{canonicalize, compile};
use crate::entities;
use crate::error::{ParseInvalid, ProfileError};
use crate::models::{snippet, Article};
use crate::profile::SelectorRules;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

/// Byline text from this marker onward is leftover markup, not part of the name.
const MARKUP_ARTIFACT: &str = "<span";

#[derive(Debug)]
struct CompiledRules {
    title: Selector,
    author_container: Selector,
    author_link: Selector,
    published_time: Selector,
    body: Selector,
    paragraph: Selector,
    ticker_carousel: Selector,
}

impl CompiledRules {
    fn new(rules: &SelectorRules) -> Result<Self, ProfileError> {
        Ok(Self {
            title: compile("title", &rules.title)?,
            author_container: compile("author container", &rules.author_container)?,
            author_link: compile("author link", &rules.author_link)?,
            published_time: compile("published time", &rules.published_time)?,
            body: compile("body", &rules.body)?,
            paragraph: compile("paragraph", &rules.paragraph)?,
            ticker_carousel: compile("ticker carousel", &rules.ticker_carousel)?,
        })
    }
}

/// Article parser bound to one site layout.
#[derive(Debug)]
pub struct ArticleParser<C> {
    rules: CompiledRules,
    source_full: String,
    clock: C,
}

impl<C: Clock> ArticleParser<C> {
    pub fn new(rules: &SelectorRules, source_full: &str, clock: C) -> Result<Self, ProfileError> {
        Ok(Self {
            rules: CompiledRules::new(rules)?,
            source_full: source_full.to_string(),
            clock,
        })
    }

    /// Parse `document`, fetched from `url`, into an [`Article`].
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub fn parse(&self, document: &Html, url: &str) -> Result<Article, ParseInvalid> {
        let url = Url::parse(url)
            .map(canonicalize)
            .map_err(|_| ParseInvalid::BadUrl {
                url: url.to_string(),
            })?;

        let full_content = self.body(document);
        if full_content.is_empty() {
            return Err(ParseInvalid::EmptyBody);
        }

        let title = self.title(document);
        let author = self.author(document);
        let (published_at, date_is_fallback) = match self.published_at(document) {
            Some(stamp) => (stamp, false),
            None => (self.clock.now().to_rfc3339(), true),
        };

        let carousel = self.ticker_text(document);
        let tags = entities::build_tags(&full_content, carousel.as_deref());

        debug!(
            has_title = title.is_some(),
            has_author = author.is_some(),
            date_is_fallback,
            tags = tags.len(),
            chars = full_content.chars().count(),
            "Parsed article"
        );

        Ok(Article {
            title,
            url: url.to_string(),
            published_at,
            date_is_fallback,
            author,
            source: self.source_full.clone(),
            content_snippet: snippet(&full_content),
            full_content,
            tags,
        })
    }

    fn title(&self, document: &Html) -> Option<String> {
        document
            .select(&self.rules.title)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    fn author(&self, document: &Html) -> Option<String> {
        let container = document.select(&self.rules.author_container).next()?;

        let linked = container
            .select(&self.rules.author_link)
            .next()
            .and_then(|link| non_empty(link.text().collect::<String>().trim()));
        if linked.is_some() {
            return linked;
        }

        // First direct text node with content; whitespace-only nodes between
        // child elements are skipped rather than yielding an empty author.
        let direct = container
            .children()
            .filter_map(|node| node.value().as_text())
            .map(|text| text.trim())
            .find(|text| !text.is_empty());
        if let Some(text) = direct {
            return Some(text.to_string());
        }

        let full = stripped_text(container, " ");
        let cleaned = full
            .split(MARKUP_ARTIFACT)
            .next()
            .unwrap_or_default()
            .trim();
        non_empty(cleaned)
    }

    fn published_at(&self, document: &Html) -> Option<String> {
        document
            .select(&self.rules.published_time)
            .next()
            .and_then(|el| el.value().attr("datetime"))
            .map(str::trim)
            .filter(|stamp| !stamp.is_empty())
            .map(str::to_string)
    }

    fn body(&self, document: &Html) -> String {
        let Some(container) = document.select(&self.rules.body).next() else {
            return String::new();
        };
        container
            .select(&self.rules.paragraph)
            .map(|p| p.text().collect::<String>().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn ticker_text(&self, document: &Html) -> Option<String> {
        document
            .select(&self.rules.ticker_carousel)
            .next()
            .map(|el| stripped_text(el, " "))
    }
}

/// Descendant text nodes, each trimmed, empties dropped, joined by `sep`.
fn stripped_text(element: ElementRef<'_>, sep: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(sep)
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}
