//! Command-line interface definitions.
//!
//! No argument is required: with none the built-in defaults tally the West
//! Bengal region pages for yesterday. Every option overrides the matching
//! setting from the config file.

use crate::config::FetcherKind;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Count yesterday's disaster stories on regional news listing pages.
///
/// # Examples
///
/// ```sh
/// # Defaults: every region, five pages each, yesterday
/// disaster_news_tally
///
/// # Two keywords, one region, JSON output
/// disaster_news_tally -r midnapore -k cyclone -k flood -f json
///
/// # Config file, counting the day before yesterday
/// disaster_news_tally -c tally.yaml -d 2
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "NEWS_TALLY_CONFIG")]
    pub config: Option<String>,

    /// Region slug to scrape (repeatable; replaces configured regions)
    #[arg(short, long)]
    pub region: Vec<String>,

    /// Extra listing page URL (repeatable; replaces configured URLs)
    #[arg(short, long)]
    pub url: Vec<String>,

    /// Keyword to tally (repeatable; replaces configured keywords)
    #[arg(short, long)]
    pub keyword: Vec<String>,

    /// Listing pages per region
    #[arg(short, long)]
    pub pages: Option<u32>,

    /// Days before today to tally (1 = yesterday)
    #[arg(short, long, env = "NEWS_TALLY_DAY_OFFSET")]
    pub day_offset: Option<u64>,

    /// How to retrieve listing pages
    #[arg(long, value_enum)]
    pub fetcher: Option<FetcherKind>,

    /// Chrome or Chromium binary
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Fetch attempts per page, including the first
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
