//! Financial entity extraction.
//!
//! Pure pattern matching over article text. Nothing here can fail: every
//! function is total over any input, including the empty string.
//!
//! # Tag Kinds
//!
//! | Prefix | Meaning | Example |
//! |--------|---------|---------|
//! | `PCT:` | percentage, `%` dropped | `PCT:3.5` |
//! | `USD:` | dollar amount, verbatim | `USD:$1,234.56` |
//! | `ACR:` | acronym from a closed vocabulary | `ACR:EPS` |
//! | (none) | ticker symbol | `AAPL`, `GOOGL.US` |
//!
//! The ticker pattern accepts any run of 1-5 uppercase letters as a whole
//! word, so it also tags ordinary uppercase abbreviations. This favours
//! recall over precision and there is no ticker registry to check against.

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([+-]?\s*\d{1,3}(?:\.\d+)?)\s*%").expect("valid percent regex"));

static DOLLAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$[,\d]{1,16}\.\d{2}\b").expect("valid dollar regex"));

static ACRONYM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(GDP|CPI|Fed|IPO|M&A|CEO|CFO|EPS|EBITDA|S&P|Q\d)\b").expect("valid acronym regex")
});

static TICKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{1,5}(?:\.[A-Z]{1,2})?\b").expect("valid ticker regex"));

/// Metrics found in an article body, in order of appearance.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FinancialMetrics {
    pub percentages: Vec<String>,
    pub dollar_values: Vec<String>,
    pub acronyms: Vec<String>,
}

/// Extract percentages, dollar amounts and acronyms from `text`.
pub fn extract(text: &str) -> FinancialMetrics {
    let percentages = PERCENT_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect();

    let dollar_values = DOLLAR_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();

    let acronyms = ACRONYM_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect();

    FinancialMetrics {
        percentages,
        dollar_values,
        acronyms,
    }
}

/// Candidate ticker symbols in `text`, deduplicated and sorted.
pub fn filter_tickers(text: &str) -> Vec<String> {
    TICKER_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .sorted()
        .dedup()
        .collect()
}

/// Build the final tag set for an article.
///
/// Metrics come from the body; tickers only from the ticker region, when the
/// page has one.
pub fn build_tags(body: &str, ticker_region: Option<&str>) -> Vec<String> {
    let metrics = extract(body);
    let tickers = ticker_region.map(filter_tickers).unwrap_or_default();

    tickers
        .into_iter()
        .chain(metrics.percentages.into_iter().map(|p| format!("PCT:{p}")))
        .chain(metrics.dollar_values.into_iter().map(|d| format!("USD:{d}")))
        .chain(metrics.acronyms.into_iter().map(|a| format!("ACR:{a}")))
        .sorted()
        .dedup()
        .collect()
}
