//! Page rendering with exponential backoff retry logic.
//!
//! Everything that turns a URL into markup lives behind the [`Render`] trait:
//! HTTP, timeouts, retries and (for renderers that drive a real browser) the
//! scroll sequence that triggers lazy-loaded content. The rest of the pipeline
//! only ever sees a markup string or a [`RenderError`].
//!
//! # Architecture
//!
//! - [`Render`]: core trait defining async page rendering
//! - [`HttpRenderer`]: fetches server-rendered markup with `reqwest`
//! - [`RetryRender`]: decorator that adds retry logic to any `Render` implementation
//!
//! # Retry Strategy
//!
//! - Only transient failures are retried (transport errors, 429, 5xx)
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay

use crate::error::RenderError;
use crate::profile::ScrollPlan;
use rand::{rng, Rng};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::StatusCode;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Browser user agent sent by default.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// How much work the renderer should do before handing the document back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Return once the document structure has loaded.
    Settled,
    /// Additionally scroll and wait to trigger lazy-loaded content.
    LazyScroll(ScrollPlan),
}

/// Trait for async page rendering.
///
/// Implementors turn a URL into a rendered markup document. A renderer that
/// cannot honor [`RenderMode::LazyScroll`] must still return whatever is
/// present after the page settles.
pub trait Render {
    async fn render(&self, url: &str, mode: RenderMode) -> Result<String, RenderError>;
}

impl<T: Render + ?Sized> Render for &T {
    async fn render(&self, url: &str, mode: RenderMode) -> Result<String, RenderError> {
        (**self).render(url, mode).await
    }
}

/// Renders pages with plain HTTP GET requests.
///
/// The server-rendered markup is the settled document; no script runs, so a
/// lazy-scroll request is logged and served from the same markup.
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: reqwest::Client,
}

impl HttpRenderer {
    /// Build a renderer with a browser-like user agent and a per-request timeout.
    pub fn new(user_agent: &str, timeout: StdDuration) -> Result<Self, RenderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Render for HttpRenderer {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn render(&self, url: &str, mode: RenderMode) -> Result<String, RenderError> {
        let parsed = url::Url::parse(url).map_err(|source| RenderError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        if let RenderMode::LazyScroll(plan) = mode {
            debug!(
                steps = plan.steps,
                pause_ms = plan.pause_ms,
                "HTTP renderer cannot scroll; using the settled document"
            );
        }

        let t0 = Instant::now();
        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(RenderError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(RenderError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Render`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryRender<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T: Render> RetryRender<T> {
    /// Create a new retry wrapper around an existing [`Render`] implementation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpRenderer::new(DEFAULT_USER_AGENT, Duration::from_secs(60))?;
    /// let renderer = RetryRender::new(http, 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryRender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryRender")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> RetryRender<T> {
    /// Delay before retry number `attempt` (1-based), without jitter.
    fn backoff(&self, attempt: usize) -> StdDuration {
        // Doubles per attempt; the factor saturates instead of overflowing.
        let exp = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let factor = 1u32.checked_shl(exp).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl<T: Render> Render for RetryRender<T> {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn render(&self, url: &str, mode: RenderMode) -> Result<String, RenderError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.render(url, mode).await {
                Ok(markup) => return Ok(markup),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if !e.is_transient() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "render() giving up"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.backoff(attempt) + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "render() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
