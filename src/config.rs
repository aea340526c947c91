//! Run configuration.
//!
//! Everything the driver needs is carried in one [`Config`] value: where the
//! listing pages are, which keywords to tally, which day counts, and how to
//! drive the browser. It is read from an optional YAML file, overridden from
//! the command line, and validated once before any page is fetched.
//!
//! ```yaml
//! base_url: https://www.anandabazar.com/west-bengal
//! regions: [bardhaman, north-bengal]
//! pages_per_region: 2
//! keywords:
//!   - flood
//!   - label: cyclone
//!     terms: [cyclone, storm]
//! ```

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::models::{Keyword, default_keywords};
use clap::ValueEnum;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, instrument};
use url::Url;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Upper bound on fetch attempts per page.
pub const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Section root the region slugs hang off.
    pub base_url: String,
    /// Region slugs, each scraped as `{base_url}/{region}/page-{n}`.
    pub regions: Vec<String>,
    /// Listing pages fetched per region.
    pub pages_per_region: u32,
    /// Extra listing URLs fetched after the region pages.
    pub urls: Vec<String>,
    /// Days before today that count as the target date.
    pub day_offset: u64,
    pub keywords: Vec<Keyword>,
    pub fetcher: FetcherKind,
    pub browser: BrowserConfig,
    pub selectors: SelectorConfig,
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://www.anandabazar.com/west-bengal".to_string(),
            regions: [
                "page",
                "bardhaman",
                "north-bengal",
                "midnapore",
                "howrah-hooghly",
                "purulia-birbhum-bankura",
                "24-parganas",
                "nadia-murshidabad",
            ]
            .iter()
            .map(|r| r.to_string())
            .collect(),
            pages_per_region: 5,
            urls: Vec::new(),
            day_offset: 1,
            keywords: default_keywords(),
            fetcher: FetcherKind::default(),
            browser: BrowserConfig::default(),
            selectors: SelectorConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// How listing pages are retrieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Render in headless Chrome; needed when teasers are built by script.
    #[default]
    Chrome,
    /// Plain HTTP GET, for server-rendered listings.
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Chrome binary; auto-detected when unset.
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub page_load_timeout_secs: u64,
    /// How long to wait for the first teaser to appear after load.
    pub render_wait_secs: u64,
    pub user_agent: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            page_load_timeout_secs: 30,
            render_wait_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// CSS selectors describing the listing markup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One element per article teaser.
    pub teaser: String,
    /// The article link, searched inside a teaser.
    pub link: String,
    /// The publish-date label, searched inside a teaser.
    pub date: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            teaser: "div.imgntextbox".to_string(),
            link: "a[href]".to_string(),
            date: ".tmstmp, time, .date".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total tries per page, including the first.
    pub attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            base_delay_ms: 500,
        }
    }
}

impl Config {
    /// Read a YAML config file.
    #[instrument(level = "info")]
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        info!(path, "Loaded configuration file");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Build the run configuration: the file named on the command line (or
    /// built-in defaults), then command-line overrides.
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match cli.config.as_deref() {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        Ok(config)
    }

    /// Command-line values win over file values. Keywords and regions given
    /// on the command line replace the configured lists.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if !cli.region.is_empty() {
            self.regions = cli.region.clone();
        }
        if !cli.url.is_empty() {
            self.urls = cli.url.clone();
        }
        if !cli.keyword.is_empty() {
            self.keywords = cli.keyword.iter().cloned().map(Keyword::plain).collect();
        }
        if let Some(pages) = cli.pages {
            self.pages_per_region = pages;
        }
        if let Some(offset) = cli.day_offset {
            self.day_offset = offset;
        }
        if let Some(fetcher) = cli.fetcher {
            self.fetcher = fetcher;
        }
        if let Some(path) = &cli.chrome_path {
            self.browser.chrome_path = Some(path.clone());
        }
        if let Some(attempts) = cli.attempts {
            self.retry.attempts = attempts;
        }
        debug!(config = ?self, "Applied command-line overrides");
    }

    /// Listing page URLs in fetch order: every page of every region, then
    /// the explicit URLs.
    pub fn listing_urls(&self) -> Result<Vec<Url>, ConfigError> {
        let base = self.base_url.trim_end_matches('/');
        let region_pages = self.regions.iter().flat_map(|region| {
            (1..=self.pages_per_region).map(move |n| format!("{base}/{region}/page-{n}"))
        });

        region_pages
            .chain(self.urls.iter().cloned())
            .map(|raw| Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { url: raw, source }))
            .collect()
    }

    /// Check everything that would otherwise fail mid-run and return the
    /// listing pages to fetch.
    pub fn validate(&self) -> Result<Vec<Url>, ConfigError> {
        if self.keywords.is_empty() {
            return Err(ConfigError::NoKeywords);
        }
        for keyword in &self.keywords {
            if keyword.label.trim().is_empty()
                || keyword.terms.is_empty()
                || keyword.terms.iter().any(|t| t.trim().is_empty())
            {
                return Err(ConfigError::EmptyKeyword(keyword.label.clone()));
            }
        }

        for (field, selector) in [
            ("teaser", &self.selectors.teaser),
            ("link", &self.selectors.link),
            ("date", &self.selectors.date),
        ] {
            if Selector::parse(selector).is_err() {
                return Err(ConfigError::InvalidSelector {
                    field,
                    selector: selector.clone(),
                });
            }
        }

        if !(1..=MAX_ATTEMPTS).contains(&self.retry.attempts) {
            return Err(ConfigError::Invalid(format!(
                "retry.attempts must be between 1 and {MAX_ATTEMPTS}, got {}",
                self.retry.attempts
            )));
        }

        let urls = self.listing_urls()?;
        if urls.is_empty() {
            return Err(ConfigError::NoPages);
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["disaster_news_tally"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults_cover_all_regions() {
        let config = Config::default();
        let urls = config.validate().unwrap();
        assert_eq!(urls.len(), 8 * 5);
        assert_eq!(
            urls[0].as_str(),
            "https://www.anandabazar.com/west-bengal/page/page-1"
        );
        assert_eq!(
            urls[5].as_str(),
            "https://www.anandabazar.com/west-bengal/bardhaman/page-1"
        );
        assert_eq!(config.keywords.len(), 4);
        assert_eq!(config.day_offset, 1);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            r#"
regions: [midnapore]
pages_per_region: 2
keywords: [cyclone, flood]
selectors:
  date: span.published
"#,
        )
        .unwrap();
        assert_eq!(config.regions, vec!["midnapore"]);
        assert_eq!(config.keywords[1], Keyword::plain("flood"));
        assert_eq!(config.selectors.date, "span.published");
        assert_eq!(config.selectors.teaser, "div.imgntextbox");
        assert_eq!(config.fetcher, FetcherKind::Chrome);
        assert_eq!(config.validate().unwrap().len(), 2);
    }

    #[test]
    fn test_explicit_urls_follow_region_pages() {
        let config = Config::from_yaml(
            r#"
regions: [nadia-murshidabad]
pages_per_region: 1
urls: ["https://example.com/listing"]
fetcher: http
"#,
        )
        .unwrap();
        let urls = config.validate().unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[1].as_str(), "https://example.com/listing");
        assert_eq!(config.fetcher, FetcherKind::Http);
    }

    #[test]
    fn test_no_pages_is_a_config_error() {
        let mut config = Config::default();
        config.regions.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoPages)));
    }

    #[test]
    fn test_no_keywords_is_a_config_error() {
        let mut config = Config::default();
        config.keywords.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoKeywords)));
    }

    #[test]
    fn test_blank_term_is_a_config_error() {
        let mut config = Config::default();
        config.keywords.push(Keyword::plain("  "));
        assert!(matches!(config.validate(), Err(ConfigError::EmptyKeyword(_))));
    }

    #[test]
    fn test_bad_url_is_a_config_error() {
        let mut config = Config::default();
        config.urls.push("not a url".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_bad_selector_is_a_config_error() {
        let mut config = Config::default();
        config.selectors.link = "a[[".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSelector { field: "link", .. })
        ));
    }

    #[test]
    fn test_attempts_are_bounded() {
        let mut config = Config::default();
        config.retry.attempts = 0;
        assert!(config.validate().is_err());
        config.retry.attempts = MAX_ATTEMPTS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = Config::from_yaml(include_str!("../tally.example.yaml")).unwrap();
        assert_eq!(config.validate().unwrap().len(), 7 * 5);
        assert_eq!(config.keywords.len(), 5);
        assert_eq!(config.keywords[4], Keyword::plain("landslide"));
        assert_eq!(config.keywords[3].terms[1], "storm");
    }

    #[test]
    fn test_malformed_yaml_fails() {
        assert!(Config::from_yaml("regions: {").is_err());
    }

    #[test]
    fn test_cli_overrides_replace_lists() {
        let mut config = Config::default();
        config.apply_cli(&cli(&[
            "-r", "midnapore", "-k", "cyclone", "-k", "flood", "-p", "1", "-d", "2",
        ]));
        assert_eq!(config.regions, vec!["midnapore"]);
        assert_eq!(
            config.keywords,
            vec![Keyword::plain("cyclone"), Keyword::plain("flood")]
        );
        assert_eq!(config.pages_per_region, 1);
        assert_eq!(config.day_offset, 2);
    }

    #[test]
    fn test_missing_config_file() {
        let err = Config::from_file("/nonexistent/news-tally.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
