//! Error taxonomy for the archive pipeline.
//!
//! Each stage of the per-URL loop has its own error type so the driver can
//! count outcomes separately:
//!
//! | Type | Stage | Effect on the run |
//! |------|-------|-------------------|
//! | [`RenderError`] | fetching markup | URL skipped, counted as a fetch failure |
//! | [`ParseInvalid`] | article extraction | URL skipped, no record produced |
//! | [`WriteError`] | archive persistence | counted as neither saved nor duplicate |
//! | [`ProfileError`] | bootstrap | fatal, the run never starts |
//!
//! A duplicate archive entry is not an error; see [`crate::archive::WriteOutcome`].

use std::path::PathBuf;
use thiserror::Error;

/// The render collaborator could not produce a document for a URL.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("no document available for {0}")]
    NotFound(String),
}

impl RenderError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RenderError::InvalidUrl { .. } | RenderError::NotFound(_) => false,
            RenderError::Http(_) => true,
            RenderError::Status { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// Structural extraction produced no usable article.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseInvalid {
    #[error("no article body content found")]
    EmptyBody,

    #[error("article url {url} is not a valid absolute url")]
    BadUrl { url: String },
}

/// Persisting an article to the archive failed.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize article: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A site profile could not be loaded or compiled.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("unknown built-in profile '{0}'")]
    Unknown(String),

    #[error("invalid {field} selector '{selector}': {reason}")]
    Selector {
        field: &'static str,
        selector: String,
        reason: String,
    },

    #[error("invalid base url '{url}': {source}")]
    BaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to read profile {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse profile: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
