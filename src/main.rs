//! # Disaster News Tally
//!
//! Counts yesterday's disaster stories on a Bangla news site's regional
//! listing pages. Each listing page is rendered in headless Chrome, its
//! article teasers are read off with their Bangla publish-date labels, and
//! the links published on the target day are tallied under every disaster
//! keyword their URL contains.
//!
//! ## Usage
//!
//! ```sh
//! disaster_news_tally
//! disaster_news_tally -c tally.yaml -f json
//! RUST_LOG=debug disaster_news_tally -r midnapore -k cyclone -k flood
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: YAML file and command line merged into one [`config::Config`]
//! 2. **Fetching**: each listing page rendered, one at a time
//! 3. **Extraction**: teasers (link + date label) located in the rendered HTML
//! 4. **Dating**: Bangla date labels converted to Gregorian dates
//! 5. **Filtering**: target-day articles filed under matching keywords
//! 6. **Report**: counts and URLs per keyword on stdout; logs go to stderr
//!
//! The process exits non-zero only when nothing can be tallied at all: bad
//! configuration or a browser that will not start. Failed pages are logged
//! and skipped.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod bangla_date;
mod cli;
mod config;
mod driver;
mod error;
mod extract;
mod fetch;
mod filter;
mod models;
mod report;
mod utils;

use cli::{Cli, OutputFormat};
use config::Config;
use driver::Driver;
use extract::{CssTeaserLocator, TeaserLocator};
use fetch::AnyFetcher;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("disaster_news_tally starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Configuration: fatal before any fetch ----
    let config = Config::load(&args).inspect_err(|e| error!(error = %e, "Invalid configuration"))?;
    let pages = config
        .validate()
        .inspect_err(|e| error!(error = %e, "Invalid configuration"))?;
    info!(pages = pages.len(), "Configuration valid");
    let locator = CssTeaserLocator::new(&config.selectors)?;
    let started = Local::now().naive_local();

    // ---- Fetcher: the browser session lives until `driver` is dropped ----
    let fetcher = AnyFetcher::from_config(&config, locator.ready_selector())
        .inspect_err(|e| error!(error = %e, fetcher = ?config.fetcher, "Could not start fetcher"))?;
    let driver = Driver::new(&config, pages, fetcher, locator, started)?;
    info!(%started, target = %driver.target(), "Tallying");

    let summary = driver.run().await;
    drop(driver);

    // ---- Report ----
    let report = match args.format {
        OutputFormat::Text => report::render_text(&summary),
        OutputFormat::Json => report::render_json(&summary)?,
    };
    print!("{report}");
    if args.format == OutputFormat::Json {
        println!();
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        pages_failed = summary.pages_failed,
        "Execution complete"
    );

    Ok(())
}
