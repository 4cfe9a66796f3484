//! Front page link discovery.
//!
//! Walks the link regions configured in a [`DiscoveryRules`] and collects
//! canonical article URLs:
//!
//! 1. Every `a[href]` inside a region is resolved against the base URL.
//! 2. Query string and fragment are removed.
//! 3. The path must contain one of the region's markers (e.g. `/news/`).
//! 4. Links to a blacklisted host (or any of its subdomains) are dropped.
//!
//! The result is a set, so a link found in several regions appears once.
//! Discovery never fails: a page without the configured regions yields an
//! empty set.

use crate::error::ProfileError;
use crate::profile::DiscoveryRules;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};
use url::Url;

/// Drop query string and fragment from an absolute URL.
pub fn canonicalize(mut url: Url) -> Url {
    url.set_query(None);
    url.set_fragment(None);
    url
}

#[derive(Debug)]
struct CompiledRegion {
    name: String,
    selector: Selector,
    path_markers: Vec<String>,
}

/// Link discoverer compiled from a profile's [`DiscoveryRules`].
#[derive(Debug)]
pub struct LinkDiscoverer {
    regions: Vec<CompiledRegion>,
    anchor: Selector,
    blacklist: Vec<String>,
}

impl LinkDiscoverer {
    pub fn new(rules: &DiscoveryRules) -> Result<Self, ProfileError> {
        let regions = rules
            .regions
            .iter()
            .map(|region| -> Result<CompiledRegion, ProfileError> {
                Ok(CompiledRegion {
                    name: region.name.clone(),
                    selector: compile("discovery region", &region.selector)?,
                    path_markers: region.path_markers.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            regions,
            anchor: compile("anchor", "a[href]")?,
            blacklist: rules
                .blacklist
                .iter()
                .map(|h| h.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        })
    }

    /// Collect canonical article URLs from `document`.
    #[instrument(level = "info", skip_all, fields(base = %base))]
    pub fn discover(&self, document: &Html, base: &Url) -> BTreeSet<String> {
        let mut urls = BTreeSet::new();

        for region in &self.regions {
            let before = urls.len();
            for container in document.select(&region.selector) {
                for link in container.select(&self.anchor) {
                    let Some(href) = link.value().attr("href") else {
                        continue;
                    };
                    if let Some(url) = self.accept(href, base, &region.path_markers) {
                        urls.insert(url);
                    }
                }
            }
            debug!(
                region = %region.name,
                added = urls.len() - before,
                "Scanned link region"
            );
        }

        info!(count = urls.len(), "Found unique article links on the front page");
        urls
    }

    fn accept(&self, href: &str, base: &Url, markers: &[String]) -> Option<String> {
        let resolved = base.join(href.trim()).ok()?;
        if !matches!(resolved.scheme(), "http" | "https") {
            return None;
        }
        let url = canonicalize(resolved);

        if !markers.iter().any(|m| url.path().contains(m.as_str())) {
            return None;
        }
        if self.is_blacklisted(&url) {
            debug!(%url, "Dropping blacklisted link");
            return None;
        }
        Some(url.to_string())
    }

    fn is_blacklisted(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.blacklist.iter().any(|blocked| {
            host == *blocked
                || host
                    .strip_suffix(blocked.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

pub(crate) fn compile(field: &'static str, selector: &str) -> Result<Selector, ProfileError> {
    Selector::parse(selector).map_err(|e| ProfileError::Selector {
        field,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::SiteProfile;

    const FRONT_PAGE: &str = r#"
        <html><body>
          <section class="module-hero hero-3-col yf-1mjoczb">
            <a href="/news/fed-holds-rates-123.html?.tsrc=hero">Fed holds</a>
            <a href="/quote/AAPL/">AAPL quote</a>
          </section>
          <div data-testid="news-stream">
            <ul>
              <li class="stream-item"><a href="https://finance.yahoo.com/m/abc-def/oil-slides.html?src=rss">Oil</a></li>
              <li class="stream-item"><a href="https://beap.gemini.yahoo.com/news/sponsored.html?x=1">Ad</a></li>
              <li class="stream-item"><a href="/news/fed-holds-rates-123.html">Fed again</a></li>
            </ul>
          </div>
          <a href="/news/outside-any-region.html">Ignored</a>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://finance.yahoo.com/").unwrap()
    }

    fn discoverer(profile: &str) -> LinkDiscoverer {
        LinkDiscoverer::new(&SiteProfile::builtin(profile).unwrap().discovery).unwrap()
    }

    #[test]
    fn test_hero_and_stream_with_blacklist() {
        let doc = Html::parse_document(FRONT_PAGE);
        let urls = discoverer("yahoo-stream").discover(&doc, &base());
        let expected: BTreeSet<String> = [
            "https://finance.yahoo.com/m/abc-def/oil-slides.html",
            "https://finance.yahoo.com/news/fed-holds-rates-123.html",
        ]
        .into_iter()
        .map(String::from)
        .collect();
        assert_eq!(urls, expected);
    }

    #[test]
    fn test_classic_variant_reads_hero_only() {
        let doc = Html::parse_document(FRONT_PAGE);
        let urls = discoverer("yahoo").discover(&doc, &base());
        assert_eq!(urls.len(), 1);
        assert!(urls.contains("https://finance.yahoo.com/news/fed-holds-rates-123.html"));
    }

    #[test]
    fn test_missing_regions_yield_empty_set() {
        let doc = Html::parse_document("<html><body><p>nothing</p></body></html>");
        assert!(discoverer("yahoo-stream").discover(&doc, &base()).is_empty());
    }

    #[test]
    fn test_non_http_links_are_ignored() {
        let doc = Html::parse_document(
            r#"<section class="module-hero"><a href="mailto:news@example.com?subject=/news/">mail</a></section>"#,
        );
        assert!(discoverer("yahoo").discover(&doc, &base()).is_empty());
    }

    #[test]
    fn test_blacklist_matches_subdomains_only_on_label_boundary() {
        let d = discoverer("yahoo");
        assert!(d.is_blacklisted(&Url::parse("https://taboola.com/news/x").unwrap()));
        assert!(d.is_blacklisted(&Url::parse("https://cdn.taboola.com/news/x").unwrap()));
        assert!(!d.is_blacklisted(&Url::parse("https://nottaboola.com/news/x").unwrap()));
    }

    #[test]
    fn test_canonicalize_strips_query_and_fragment() {
        let url = Url::parse("https://finance.yahoo.com/news/a.html?x=1#top").unwrap();
        assert_eq!(
            canonicalize(url).as_str(),
            "https://finance.yahoo.com/news/a.html"
        );
    }

    #[test]
    fn test_bad_region_selector_is_rejected() {
        let mut rules = SiteProfile::builtin("yahoo").unwrap().discovery;
        rules.regions[0].selector = "section[".to_string();
        assert!(matches!(
            LinkDiscoverer::new(&rules),
            Err(ProfileError::Selector { .. })
        ));
    }
}
