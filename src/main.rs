//! # Finance News Archive
//!
//! Discovers article links on a financial news front page, extracts a
//! structured record from each article, tags it with the financial entities
//! found in its text, and archives every record exactly once in a
//! date-partitioned JSON tree.
//!
//! ## Usage
//!
//! ```sh
//! finance_news_archive -r ./archive -p yahoo-stream
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Discovery**: Render the front page and collect canonical article URLs
//! 2. **Rendering**: Fetch each article page (with retries)
//! 3. **Parsing**: Extract the article record and its entity tags
//! 4. **Archiving**: Write each record once under `data/<source>/<year>/<month>/`
//!
//! Articles are handled one at a time with a random pause in between.

use clap::Parser;
use std::error::Error;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod archive;
mod cli;
mod clock;
mod discover;
mod entities;
mod error;
mod models;
mod parser;
mod pipeline;
mod profile;
mod render;
mod utils;

use clock::SystemClock;
use cli::Cli;
use pipeline::{Pacing, Pipeline};
use profile::SiteProfile;
use render::{HttpRenderer, RetryRender};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("finance_news_archive starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Site profile ----
    let mut profile = match &args.profile_file {
        Some(path) => SiteProfile::load(path).await?,
        None => SiteProfile::builtin(&args.profile)?,
    };
    if let Some(base_url) = &args.base_url {
        profile.base_url = base_url.clone();
    }
    info!(profile = %profile.name, base = %profile.base_url, "Using site profile");

    // Early check: ensure the archive root is writable
    if let Err(e) = ensure_writable_dir(&args.archive_root).await {
        error!(
            path = %args.archive_root.display(),
            error = %e,
            "Archive root is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Renderer ----
    let http = HttpRenderer::new(&args.user_agent, StdDuration::from_millis(args.timeout_ms))?;
    let renderer = RetryRender::new(http, args.retries, StdDuration::from_secs(1));

    let pacing = Pacing::new(
        StdDuration::from_millis(args.min_delay_ms),
        StdDuration::from_millis(args.max_delay_ms),
    );
    let pipeline = Pipeline::new(&profile, &args.archive_root, renderer, SystemClock, pacing)?;
    debug!(?pipeline, "Pipeline ready");

    let report = pipeline.run().await;
    println!("{report}");

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
