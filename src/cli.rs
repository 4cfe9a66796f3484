//! Command-line interface definitions.
//!
//! All options can be provided via command-line flags or environment variables.

use crate::profile::BUILTIN_PROFILES;
use crate::render::DEFAULT_USER_AGENT;
use clap::builder::PossibleValuesParser;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for one archive run.
///
/// # Examples
///
/// ```sh
/// # Archive the classic front page layout into the current directory
/// finance_news_archive
///
/// # Use the news-stream layout and a dedicated archive root
/// finance_news_archive -p yahoo-stream -r /srv/news
///
/// # Load a custom site profile
/// finance_news_archive --profile-file ./profiles/yahoo-2025.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Archive root; records are written under `<root>/data/`
    #[arg(short = 'r', long, env = "NEWS_ARCHIVE_ROOT", default_value = ".")]
    pub archive_root: PathBuf,

    /// Built-in site profile
    #[arg(
        short,
        long,
        env = "NEWS_SITE_PROFILE",
        default_value = "yahoo",
        value_parser = PossibleValuesParser::new(BUILTIN_PROFILES)
    )]
    pub profile: String,

    /// YAML site profile; takes precedence over `--profile`
    #[arg(long, env = "NEWS_SITE_PROFILE_FILE")]
    pub profile_file: Option<PathBuf>,

    /// Override the profile's front page URL
    #[arg(long, env = "NEWS_BASE_URL")]
    pub base_url: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, env = "NEWS_RENDER_TIMEOUT_MS", default_value_t = 60_000)]
    pub timeout_ms: u64,

    /// Retries for transient fetch failures
    #[arg(long, env = "NEWS_RENDER_RETRIES", default_value_t = 2)]
    pub retries: usize,

    /// Lower bound of the pause between articles, in milliseconds
    #[arg(long, env = "NEWS_MIN_DELAY_MS", default_value_t = 500)]
    pub min_delay_ms: u64,

    /// Upper bound of the pause between articles, in milliseconds
    #[arg(long, env = "NEWS_MAX_DELAY_MS", default_value_t = 1500)]
    pub max_delay_ms: u64,

    /// User agent sent with every request
    #[arg(long, env = "NEWS_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}
