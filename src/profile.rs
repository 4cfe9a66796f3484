//! Site profiles: everything that differs between versions of a news site.
//!
//! A profile names the site, where its front page lives, which regions of the
//! front page hold article links, and which selectors locate each article
//! field. Switching site layouts is a matter of choosing (or loading) another
//! profile, not changing code.
//!
//! # Built-in Profiles
//!
//! | Name | Discovery regions | Lazy scroll |
//! |------|-------------------|-------------|
//! | `yahoo` | hero section | no |
//! | `yahoo-stream` | hero section, news stream | yes |
//!
//! # YAML Profiles
//!
//! ```yaml
//! name: yahoo-custom
//! base_url: https://finance.yahoo.com/
//! source_short: yahoo
//! source_full: finance.yahoo.com
//! discovery:
//!   regions:
//!     - name: hero
//!       selector: section.module-hero
//!       path_markers: ["/news/"]
//!   blacklist: ["beap.gemini.yahoo.com"]
//! article:
//!   title: h1.cover-title
//!   author_container: div.byline-attr-author
//!   author_link: a
//!   published_time: div.byline-attr-time-style time.byline-attr-meta-time
//!   body: div[data-testid="article-body"]
//!   paragraph: p
//!   ticker_carousel: div.scroll-carousel
//! ```

use crate::error::ProfileError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, instrument};
use url::Url;

/// Names accepted by [`SiteProfile::builtin`].
pub const BUILTIN_PROFILES: [&str; 2] = ["yahoo", "yahoo-stream"];

/// Configuration for one site layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub name: String,
    /// Front page to discover links on; also the base for relative hrefs.
    pub base_url: String,
    /// Short source name used in archive paths and filenames.
    pub source_short: String,
    /// Source name written into each record.
    pub source_full: String,
    pub discovery: DiscoveryRules,
    pub article: SelectorRules,
}

/// Where to look for article links on the front page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryRules {
    pub regions: Vec<LinkRegion>,
    /// Hosts whose links are always dropped. Subdomains match too.
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Scrolling to ask the renderer for before the front page is read.
    #[serde(default)]
    pub lazy_scroll: Option<ScrollPlan>,
}

/// A region of the front page holding article links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRegion {
    pub name: String,
    /// CSS selector for the region container(s).
    pub selector: String,
    /// A link is kept only if its path contains one of these.
    pub path_markers: Vec<String>,
}

/// Bounded scroll-and-wait sequence used to trigger lazy-loaded content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollPlan {
    pub steps: u32,
    pub pause_ms: u64,
}

/// CSS selectors for each article field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorRules {
    pub title: String,
    pub author_container: String,
    /// Looked up inside the author container.
    pub author_link: String,
    /// Element carrying a machine-readable `datetime` attribute.
    pub published_time: String,
    pub body: String,
    /// Looked up inside the body container.
    pub paragraph: String,
    pub ticker_carousel: String,
}

impl SelectorRules {
    fn yahoo() -> Self {
        Self {
            title: "h1.cover-title".to_string(),
            author_container: "div.byline-attr-author".to_string(),
            author_link: "a".to_string(),
            published_time: "div.byline-attr-time-style time.byline-attr-meta-time".to_string(),
            body: r#"div[data-testid="article-body"]"#.to_string(),
            paragraph: "p".to_string(),
            ticker_carousel: "div.scroll-carousel".to_string(),
        }
    }
}

fn yahoo_blacklist() -> Vec<String> {
    [
        "beap.gemini.yahoo.com",
        "consent.yahoo.com",
        "taboola.com",
        "outbrain.com",
        "zergnet.com",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect()
}

fn hero_region() -> LinkRegion {
    LinkRegion {
        name: "hero".to_string(),
        selector: "section.module-hero".to_string(),
        path_markers: vec!["/news/".to_string()],
    }
}

impl SiteProfile {
    /// Look up a built-in profile by name.
    pub fn builtin(name: &str) -> Result<Self, ProfileError> {
        let mut profile = Self {
            name: name.to_string(),
            base_url: "https://finance.yahoo.com/".to_string(),
            source_short: "yahoo".to_string(),
            source_full: "finance.yahoo.com".to_string(),
            discovery: DiscoveryRules {
                regions: vec![hero_region()],
                blacklist: yahoo_blacklist(),
                lazy_scroll: None,
            },
            article: SelectorRules::yahoo(),
        };

        match name {
            "yahoo" => {}
            "yahoo-stream" => {
                profile.discovery.regions.push(LinkRegion {
                    name: "stream".to_string(),
                    selector: r#"[data-testid="news-stream"] li.stream-item"#.to_string(),
                    path_markers: vec!["/news/".to_string(), "/m/".to_string()],
                });
                profile.discovery.lazy_scroll = Some(ScrollPlan {
                    steps: 5,
                    pause_ms: 1000,
                });
            }
            other => return Err(ProfileError::Unknown(other.to_string())),
        }
        Ok(profile)
    }

    /// Parse a profile from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ProfileError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read a profile from a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, ProfileError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ProfileError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let profile = Self::from_yaml(&text)?;
        info!(name = %profile.name, "Loaded site profile");
        Ok(profile)
    }

    /// The front page URL, parsed.
    pub fn base(&self) -> Result<Url, ProfileError> {
        Url::parse(&self.base_url).map_err(|source| ProfileError::BaseUrl {
            url: self.base_url.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_exist() {
        for name in BUILTIN_PROFILES {
            let profile = SiteProfile::builtin(name).unwrap();
            assert_eq!(profile.name, name);
            assert!(profile.base().is_ok());
        }
    }

    #[test]
    fn test_stream_profile_adds_region_and_scroll() {
        let classic = SiteProfile::builtin("yahoo").unwrap();
        let stream = SiteProfile::builtin("yahoo-stream").unwrap();
        assert_eq!(classic.discovery.regions.len(), 1);
        assert_eq!(stream.discovery.regions.len(), 2);
        assert!(classic.discovery.lazy_scroll.is_none());
        assert!(stream.discovery.lazy_scroll.is_some());
    }

    #[test]
    fn test_unknown_builtin() {
        let err = SiteProfile::builtin("reuters").unwrap_err();
        assert!(matches!(err, ProfileError::Unknown(name) if name == "reuters"));
    }

    #[test]
    fn test_yaml_round_trip_of_builtin() {
        let profile = SiteProfile::builtin("yahoo-stream").unwrap();
        let yaml = serde_yaml::to_string(&profile).unwrap();
        assert_eq!(SiteProfile::from_yaml(&yaml).unwrap(), profile);
    }

    #[test]
    fn test_yaml_defaults_optional_discovery_fields() {
        let yaml = r#"
name: minimal
base_url: https://example.com/
source_short: ex
source_full: example.com
discovery:
  regions:
    - name: main
      selector: main
      path_markers: ["/story/"]
article:
  title: h1
  author_container: .byline
  author_link: a
  published_time: time
  body: article
  paragraph: p
  ticker_carousel: .tickers
"#;
        let profile = SiteProfile::from_yaml(yaml).unwrap();
        assert!(profile.discovery.blacklist.is_empty());
        assert!(profile.discovery.lazy_scroll.is_none());
        assert_eq!(profile.discovery.regions[0].path_markers, vec!["/story/"]);
    }

    #[test]
    fn test_bad_yaml_is_an_error() {
        assert!(matches!(
            SiteProfile::from_yaml("name: [unterminated"),
            Err(ProfileError::Yaml(_))
        ));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = SiteProfile::load(Path::new("/definitely/not/here.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::Read { .. }));
    }

    #[test]
    fn test_bad_base_url() {
        let mut profile = SiteProfile::builtin("yahoo").unwrap();
        profile.base_url = "not a url".to_string();
        assert!(matches!(profile.base(), Err(ProfileError::BaseUrl { .. })));
    }
}
