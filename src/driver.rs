//! The tally run: every listing page in turn, fetched, parsed, dated and
//! filed.
//!
//! Pages are handled strictly one after another. A page that cannot be
//! fetched is logged and skipped; an article whose date label cannot be read
//! is logged and left out. Neither stops the run.

use crate::bangla_date::resolve_date;
use crate::config::Config;
use crate::error::ConfigError;
use crate::extract::TeaserLocator;
use crate::fetch::PageFetcher;
use crate::filter::AggregationTable;
use crate::models::{Article, Keyword};
use crate::utils::truncate_for_log;
use chrono::{Days, NaiveDate, NaiveDateTime};
use itertools::Itertools;
use scraper::Html;
use tracing::{debug, error, info, instrument};
use url::Url;

/// The day whose articles are tallied: `today` minus `day_offset` days.
pub fn target_date(today: NaiveDate, day_offset: u64) -> Result<NaiveDate, ConfigError> {
    today
        .checked_sub_days(Days::new(day_offset))
        .ok_or_else(|| ConfigError::Invalid(format!("day offset {day_offset} is out of range")))
}

/// Outcome of a run: the tally plus what happened along the way.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub target: NaiveDate,
    pub table: AggregationTable,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub teasers: usize,
    pub skipped_teasers: usize,
    pub unparsable_dates: usize,
    pub on_target: usize,
}

impl RunSummary {
    fn new(keywords: &[Keyword], target: NaiveDate) -> Self {
        Self {
            target,
            table: AggregationTable::new(keywords),
            pages_fetched: 0,
            pages_failed: 0,
            teasers: 0,
            skipped_teasers: 0,
            unparsable_dates: 0,
            on_target: 0,
        }
    }
}

/// Runs fetcher, extractor, date converter and filter over the configured
/// listing pages.
#[derive(Debug)]
pub struct Driver<F, L> {
    urls: Vec<Url>,
    keywords: Vec<Keyword>,
    fetcher: F,
    locator: L,
    started: NaiveDateTime,
    target: NaiveDate,
}

impl<F, L> Driver<F, L>
where
    F: PageFetcher,
    L: TeaserLocator,
{
    /// Set up a run over `urls`, the listing pages [`Config::validate`]
    /// returned for `config`. `started` is the local time the run began;
    /// the target date and relative date labels are both taken from it.
    pub fn new(
        config: &Config,
        urls: Vec<Url>,
        fetcher: F,
        locator: L,
        started: NaiveDateTime,
    ) -> Result<Self, ConfigError> {
        let target = target_date(started.date(), config.day_offset)?;
        info!(
            pages = urls.len(),
            keywords = %config.keywords.iter().map(|k| k.label.as_str()).join(", "),
            %target,
            "Driver ready"
        );
        Ok(Self {
            urls,
            keywords: config.keywords.clone(),
            fetcher,
            locator,
            started,
            target,
        })
    }

    pub fn target(&self) -> NaiveDate {
        self.target
    }

    /// Process every listing page and return the tally.
    #[instrument(level = "info", skip_all, fields(target = %self.target))]
    pub async fn run(&self) -> RunSummary {
        let mut summary = RunSummary::new(&self.keywords, self.target);

        for url in &self.urls {
            match self.fetcher.fetch(url.as_str()).await {
                Ok(html) => {
                    summary.pages_fetched += 1;
                    self.scrape_page(url, &html, &mut summary);
                }
                Err(e) => {
                    summary.pages_failed += 1;
                    error!(%url, error = %e, "Skipping listing page");
                }
            }
        }

        info!(
            pages_fetched = summary.pages_fetched,
            pages_failed = summary.pages_failed,
            teasers = summary.teasers,
            skipped = summary.skipped_teasers,
            unparsable = summary.unparsable_dates,
            on_target = summary.on_target,
            matched = summary.table.total(),
            "Run complete"
        );
        summary
    }

    fn scrape_page(&self, url: &Url, html: &str, summary: &mut RunSummary) {
        let document = Html::parse_document(html);
        let mut teasers = self.locator.locate(&document, url);
        let mut found = 0usize;
        let mut matched = 0usize;

        for teaser in teasers.by_ref() {
            found += 1;
            let resolved = resolve_date(&teaser.raw_date, self.started);
            let article = Article::new(teaser, resolved.as_ref().ok().copied());
            if let Err(e) = resolved {
                summary.unparsable_dates += 1;
                debug!(
                    article = %article.url,
                    raw = %truncate_for_log(&article.raw_date_text, 60),
                    error = %e,
                    "Unparsable date label"
                );
            }
            if article.resolved_date == Some(self.target) {
                summary.on_target += 1;
            }
            matched += summary.table.ingest(&article, self.target);
        }

        summary.teasers += found;
        summary.skipped_teasers += teasers.skipped();
        info!(
            %url,
            teasers = found,
            skipped = teasers.skipped(),
            matched,
            "Scraped listing page"
        );
    }
}
