//! Teaser extraction from rendered listing pages.
//!
//! All knowledge of the listing markup sits behind [`TeaserLocator`]. A
//! locator turns a parsed document into candidate teasers; [`Teasers`] walks
//! them lazily in document order and drops the ones that lack a usable link
//! or date label, keeping a count on the side.

use crate::config::SelectorConfig;
use crate::error::ConfigError;
use crate::models::Teaser;
use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Finds article teasers in a listing page.
pub trait TeaserLocator {
    /// CSS selector that is present once the teaser list has rendered.
    fn ready_selector(&self) -> &str;

    /// Lazily locate teasers in `document`, resolving links against `base`.
    fn locate<'a>(&'a self, document: &'a Html, base: &'a Url) -> Teasers<'a>;
}

/// One-pass iterator over the teasers of a page.
///
/// Candidates the locator could not complete are omitted; [`Teasers::skipped`]
/// reports how many so far.
pub struct Teasers<'a> {
    candidates: Box<dyn Iterator<Item = Option<Teaser>> + 'a>,
    skipped: usize,
}

impl<'a> Teasers<'a> {
    pub fn new(candidates: impl Iterator<Item = Option<Teaser>> + 'a) -> Self {
        Self {
            candidates: Box::new(candidates),
            skipped: 0,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for Teasers<'_> {
    type Item = Teaser;

    fn next(&mut self) -> Option<Teaser> {
        loop {
            match self.candidates.next()? {
                Some(teaser) => return Some(teaser),
                None => self.skipped += 1,
            }
        }
    }
}

/// Locator driven by three CSS selectors: the teaser container, the link
/// inside it, and the date label inside it.
#[derive(Debug)]
pub struct CssTeaserLocator {
    teaser_css: String,
    teaser: Selector,
    link: Selector,
    date: Selector,
}

impl CssTeaserLocator {
    pub fn new(selectors: &SelectorConfig) -> Result<Self, ConfigError> {
        let parse = |field: &'static str, css: &str| {
            Selector::parse(css).map_err(|_| ConfigError::InvalidSelector {
                field,
                selector: css.to_string(),
            })
        };
        Ok(Self {
            teaser_css: selectors.teaser.clone(),
            teaser: parse("teaser", &selectors.teaser)?,
            link: parse("link", &selectors.link)?,
            date: parse("date", &selectors.date)?,
        })
    }

    fn teaser_from(&self, container: ElementRef<'_>, base: &Url) -> Option<Teaser> {
        let url = container
            .select(&self.link)
            .filter_map(|a| a.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .filter_map(|href| base.join(href).ok())
            .find(|url| matches!(url.scheme(), "http" | "https"))?;

        let raw_date = container
            .select(&self.date)
            .map(|label| label.text().flat_map(str::split_whitespace).join(" "))
            .find(|text| !text.is_empty())?;

        Some(Teaser {
            url: readable(&url),
            raw_date,
        })
    }
}

/// The joined URL with its percent escapes decoded, so a Bangla slug reads
/// as Bangla again. Falls back to the encoded form if the escapes are not
/// valid UTF-8.
fn readable(url: &Url) -> String {
    urlencoding::decode(url.as_str())
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| url.to_string())
}

impl TeaserLocator for CssTeaserLocator {
    fn ready_selector(&self) -> &str {
        &self.teaser_css
    }

    fn locate<'a>(&'a self, document: &'a Html, base: &'a Url) -> Teasers<'a> {
        Teasers::new(
            document
                .select(&self.teaser)
                .map(move |container| self.teaser_from(container, base)),
        )
    }
}
