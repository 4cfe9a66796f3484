//! Date-partitioned JSON archive.
//!
//! # Layout
//!
//! ```text
//! {root}/data/{source}/{YYYY}/{MM}/{source}-{YYYYMMDD}-{id}.json
//! ```
//!
//! `id` is the last eight hex characters of the MD5 digest of the canonical
//! article URL, and the day comes from the article's publish timestamp. The
//! same URL published on the same day therefore always lands on the same
//! path, across runs and processes.
//!
//! # Deduplication
//!
//! The filesystem is the only record of what has been seen. Files are created
//! with create-if-absent semantics, so an existing file is reported as a
//! duplicate and never overwritten, even when two writers race on the same
//! identifier.

use crate::clock::Clock;
use crate::error::WriteError;
use crate::models::Article;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use md5::{Digest, Md5};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

/// Result of a successful [`ArchiveWriter::write`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Saved(PathBuf),
    Duplicate(PathBuf),
}

/// Eight-hex-character identifier for a canonical URL.
pub fn url_id(url: &str) -> String {
    let digest = hex::encode(Md5::digest(url.as_bytes()));
    digest[digest.len() - 8..].to_string()
}

/// Calendar day of an ISO 8601 timestamp, in the timestamp's own offset.
///
/// Accepts RFC 3339 (including a trailing `Z`), naive date-times with a `T` or
/// space separator and optional fractional seconds, and bare dates.
pub fn publish_day(stamp: &str) -> Option<NaiveDate> {
    let stamp = stamp.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(stamp) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(stamp, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(stamp, "%Y-%m-%d").ok()
}

/// Writes articles for one source into an archive root.
#[derive(Debug)]
pub struct ArchiveWriter<C> {
    root: PathBuf,
    source_short: String,
    clock: C,
}

impl<C: Clock> ArchiveWriter<C> {
    pub fn new(root: impl Into<PathBuf>, source_short: &str, clock: C) -> Self {
        Self {
            root: root.into(),
            source_short: source_short.to_string(),
            clock,
        }
    }

    /// Target path for `article`.
    pub fn path_for(&self, article: &Article) -> PathBuf {
        let day = publish_day(&article.published_at).unwrap_or_else(|| {
            let today = self.clock.now().date_naive();
            warn!(
                date = %article.published_at,
                fallback = %today,
                "Unparseable publish date; archiving under today's date"
            );
            today
        });

        self.root
            .join("data")
            .join(&self.source_short)
            .join(format!("{:04}", day.year()))
            .join(format!("{:02}", day.month()))
            .join(format!(
                "{}-{}-{}.json",
                self.source_short,
                day.format("%Y%m%d"),
                url_id(&article.url)
            ))
    }

    /// Persist `article` unless a record with the same identity exists.
    #[instrument(level = "info", skip_all, fields(url = %article.url))]
    pub async fn write(&self, article: &Article) -> Result<WriteOutcome, WriteError> {
        let path = self.path_for(article);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await.map_err(|source| WriteError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let body = to_json(article)?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "Record already archived");
                return Ok(WriteOutcome::Duplicate(path));
            }
            Err(source) => return Err(WriteError::Io { path, source }),
        };

        if let Err(source) = write_body(&mut file, &body).await {
            discard_partial(&path).await;
            return Err(WriteError::Io { path, source });
        }

        info!(path = %path.display(), "Saved article");
        Ok(WriteOutcome::Saved(path))
    }
}

/// Indented JSON with non-ASCII text left unescaped.
fn to_json(article: &Article) -> Result<Vec<u8>, WriteError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    article.serialize(&mut ser)?;
    Ok(buf)
}

async fn write_body(file: &mut fs::File, body: &[u8]) -> std::io::Result<()> {
    file.write_all(body).await?;
    file.flush().await
}

async fn discard_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove partial record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::DateTime;

    fn clock() -> FixedClock {
        FixedClock(DateTime::parse_from_rfc3339("2030-12-24T10:00:00+00:00").unwrap())
    }

    fn article(url: &str, date: &str) -> Article {
        Article {
            title: Some("Título".to_string()),
            url: url.to_string(),
            published_at: date.to_string(),
            date_is_fallback: false,
            author: None,
            source: "finance.yahoo.com".to_string(),
            content_snippet: "Ações sobem 2%".to_string(),
            full_content: "Ações sobem 2%".to_string(),
            tags: vec!["PCT:2".to_string()],
        }
    }

    #[test]
    fn test_url_id_is_md5_suffix() {
        // md5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(url_id(""), "ecf8427e");
        assert_eq!(url_id("https://a.example/x").len(), 8);
        assert_ne!(url_id("https://a.example/x"), url_id("https://a.example/y"));
    }

    #[test]
    fn test_publish_day_formats() {
        let may6 = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
        assert_eq!(publish_day("2025-05-06T14:30:00.000Z"), Some(may6));
        assert_eq!(publish_day("2025-05-06T23:30:00-05:00"), Some(may6));
        assert_eq!(publish_day("2025-05-06T14:30:00.123456"), Some(may6));
        assert_eq!(publish_day("2025-05-06 14:30:00"), Some(may6));
        assert_eq!(publish_day("2025-05-06"), Some(may6));
        assert_eq!(publish_day("yesterday"), None);
    }

    #[test]
    fn test_path_layout() {
        let writer = ArchiveWriter::new("/archive", "yahoo", clock());
        let a = article("https://finance.yahoo.com/news/a.html", "2025-05-06T14:30:00Z");
        let expected = PathBuf::from(format!(
            "/archive/data/yahoo/2025/05/yahoo-20250506-{}.json",
            url_id(&a.url)
        ));
        assert_eq!(writer.path_for(&a), expected);
    }

    #[test]
    fn test_unparseable_date_uses_clock_day() {
        let writer = ArchiveWriter::new("/archive", "yahoo", clock());
        let a = article("https://finance.yahoo.com/news/a.html", "sometime");
        let path = writer.path_for(&a);
        assert!(path.starts_with("/archive/data/yahoo/2030/12"));
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("yahoo-20301224-")
        );
    }

    #[tokio::test]
    async fn test_write_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArchiveWriter::new(dir.path(), "yahoo", clock());
        let a = article("https://finance.yahoo.com/news/a.html", "2025-05-06T14:30:00Z");

        let first = writer.write(&a).await.unwrap();
        let WriteOutcome::Saved(path) = first else {
            panic!("expected first write to save, got {first:?}");
        };
        let stored = std::fs::read_to_string(&path).unwrap();

        for _ in 0..2 {
            assert_eq!(
                writer.write(&a).await.unwrap(),
                WriteOutcome::Duplicate(path.clone())
            );
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), stored);
    }

    #[tokio::test]
    async fn test_duplicate_does_not_overwrite_changed_record() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArchiveWriter::new(dir.path(), "yahoo", clock());
        let a = article("https://finance.yahoo.com/news/a.html", "2025-05-06T01:00:00Z");
        let mut b = a.clone();
        b.published_at = "2025-05-06T22:00:00Z".to_string();
        b.full_content = "different".to_string();

        let WriteOutcome::Saved(path) = writer.write(&a).await.unwrap() else {
            panic!("expected save");
        };
        assert!(matches!(writer.write(&b).await.unwrap(), WriteOutcome::Duplicate(_)));
        let back: Article = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back, a);
    }

    #[tokio::test]
    async fn test_json_is_indented_and_unescaped() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArchiveWriter::new(dir.path(), "yahoo", clock());
        let a = article("https://finance.yahoo.com/news/a.html", "2025-05-06T14:30:00Z");
        let WriteOutcome::Saved(path) = writer.write(&a).await.unwrap() else {
            panic!("expected save");
        };
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("\n    \"title\": \"Título\""));
        assert!(text.contains("\"author\": \"Not Found\""));
        assert!(text.contains("Ações"));
    }

    #[tokio::test]
    async fn test_different_days_are_different_records() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArchiveWriter::new(dir.path(), "yahoo", clock());
        let a = article("https://finance.yahoo.com/news/a.html", "2025-05-06T14:30:00Z");
        let b = article("https://finance.yahoo.com/news/a.html", "2025-05-07T14:30:00Z");
        assert!(matches!(writer.write(&a).await.unwrap(), WriteOutcome::Saved(_)));
        assert!(matches!(writer.write(&b).await.unwrap(), WriteOutcome::Saved(_)));
    }

    #[tokio::test]
    async fn test_unwritable_root_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let writer = ArchiveWriter::new(&blocker, "yahoo", clock());
        let a = article("https://finance.yahoo.com/news/a.html", "2025-05-06T14:30:00Z");
        assert!(matches!(writer.write(&a).await, Err(WriteError::Io { .. })));
    }
}
