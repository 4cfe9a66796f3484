//! The discovery → render → parse → archive loop.
//!
//! A run renders the front page, discovers article links, then handles each
//! link strictly in order:
//!
//! 1. **Render** the article page (failure: counted as a fetch failure)
//! 2. **Parse** it into an [`Article`](crate::models::Article) (failure: counted as invalid)
//! 3. **Write** it to the archive (saved, duplicate, or write error)
//! 4. **Pause** for a random delay before the next link
//!
//! Nothing that goes wrong for a single URL stops the run.

use crate::archive::{ArchiveWriter, WriteOutcome};
use crate::clock::Clock;
use crate::discover::LinkDiscoverer;
use crate::error::ProfileError;
use crate::parser::ArticleParser;
use crate::profile::SiteProfile;
use crate::render::{Render, RenderMode};
use rand::{rng, Rng};
use scraper::Html;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration as StdDuration;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};
use url::Url;

/// Bounds of the random pause between articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min: StdDuration,
    pub max: StdDuration,
}

impl Pacing {
    /// Build pacing bounds, swapping them if given in the wrong order.
    pub fn new(min: StdDuration, max: StdDuration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    fn pick(&self) -> StdDuration {
        if self.max.is_zero() {
            return StdDuration::ZERO;
        }
        let ms = rng().random_range(self.min.as_millis() as u64..=self.max.as_millis() as u64);
        StdDuration::from_millis(ms)
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min: StdDuration::from_millis(500),
            max: StdDuration::from_millis(1500),
        }
    }
}

/// Counts gathered over one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub links_found: usize,
    pub processed: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub fetch_failures: usize,
    pub invalid: usize,
    pub write_errors: usize,
}

impl RunReport {
    pub fn failed(&self) -> usize {
        self.fetch_failures + self.invalid + self.write_errors
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.links_found == 0 {
            return write!(f, "No article links found.");
        }
        write!(
            f,
            "Finished. Found {} links, processed {}: saved {} new, skipped {} duplicates, {} failed.",
            self.links_found,
            self.processed,
            self.saved,
            self.duplicates,
            self.failed()
        )
    }
}

/// What happened to a single URL.
#[derive(Debug)]
enum UrlOutcome {
    Saved,
    Duplicate(PathBuf),
    FetchFailed,
    Invalid,
    WriteFailed,
}

/// Pipeline for one site profile.
pub struct Pipeline<R, C> {
    base: Url,
    front_page_mode: RenderMode,
    discoverer: LinkDiscoverer,
    parser: ArticleParser<C>,
    writer: ArchiveWriter<C>,
    renderer: R,
    pacing: Pacing,
}

impl<R, C> fmt::Debug for Pipeline<R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("base", &self.base.as_str())
            .field("front_page_mode", &self.front_page_mode)
            .field("pacing", &self.pacing)
            .finish()
    }
}

impl<R: Render, C: Clock + Clone> Pipeline<R, C> {
    /// Compile `profile` and wire it to a renderer, clock and archive root.
    pub fn new(
        profile: &SiteProfile,
        archive_root: impl Into<PathBuf>,
        renderer: R,
        clock: C,
        pacing: Pacing,
    ) -> Result<Self, ProfileError> {
        let front_page_mode = match profile.discovery.lazy_scroll {
            Some(plan) => RenderMode::LazyScroll(plan),
            None => RenderMode::Settled,
        };
        Ok(Self {
            base: profile.base()?,
            front_page_mode,
            discoverer: LinkDiscoverer::new(&profile.discovery)?,
            parser: ArticleParser::new(&profile.article, &profile.source_full, clock.clone())?,
            writer: ArchiveWriter::new(archive_root, &profile.source_short, clock),
            renderer,
            pacing,
        })
    }

    /// Render the front page and collect article links from it.
    #[instrument(level = "info", skip_all, fields(base = %self.base))]
    pub async fn discover(&self) -> BTreeSet<String> {
        let markup = match self.renderer.render(self.base.as_str(), self.front_page_mode).await {
            Ok(markup) => markup,
            Err(e) => {
                error!(error = %e, "Could not retrieve the front page");
                return BTreeSet::new();
            }
        };
        let document = Html::parse_document(&markup);
        self.discoverer.discover(&document, &self.base)
    }

    /// Run discovery and process every discovered link.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self) -> RunReport {
        let urls = self.discover().await;
        let mut report = RunReport {
            links_found: urls.len(),
            ..RunReport::default()
        };
        if urls.is_empty() {
            warn!("No article links found");
            return report;
        }

        info!(count = urls.len(), "Processing links");
        for (i, url) in urls.iter().enumerate() {
            report.processed += 1;
            match self.process(url).await {
                UrlOutcome::Saved => report.saved += 1,
                UrlOutcome::Duplicate(path) => {
                    info!(%url, path = %path.display(), "Duplicate skipped");
                    report.duplicates += 1;
                }
                UrlOutcome::FetchFailed => report.fetch_failures += 1,
                UrlOutcome::Invalid => report.invalid += 1,
                UrlOutcome::WriteFailed => report.write_errors += 1,
            }

            if i + 1 < urls.len() {
                sleep(self.pacing.pick()).await;
            }
        }

        info!(
            found = report.links_found,
            processed = report.processed,
            saved = report.saved,
            duplicates = report.duplicates,
            fetch_failures = report.fetch_failures,
            invalid = report.invalid,
            write_errors = report.write_errors,
            "Run complete"
        );
        report
    }

    async fn process(&self, url: &str) -> UrlOutcome {
        let markup = match self.renderer.render(url, RenderMode::Settled).await {
            Ok(markup) => markup,
            Err(e) => {
                warn!(%url, error = %e, "Fetch failed; skipping");
                return UrlOutcome::FetchFailed;
            }
        };

        let parsed = {
            let document = Html::parse_document(&markup);
            self.parser.parse(&document, url)
        };
        let article = match parsed {
            Ok(article) => article,
            Err(reason) => {
                warn!(%url, %reason, "Skipping article");
                return UrlOutcome::Invalid;
            }
        };

        match self.writer.write(&article).await {
            Ok(WriteOutcome::Saved(_)) => UrlOutcome::Saved,
            Ok(WriteOutcome::Duplicate(path)) => UrlOutcome::Duplicate(path),
            Err(e) => {
                error!(%url, error = %e, "Failed to save article");
                UrlOutcome::WriteFailed
            }
        }
    }
}
