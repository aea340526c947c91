//! Error taxonomy for a tally run.
//!
//! Only [`ConfigError`] is fatal. [`FetchError`] is caught per listing page
//! and [`UnparsableDateError`] per article; both are logged and the run goes
//! on. A teaser without a link or date label is not an error at all, it is
//! simply counted as skipped by the extractor.

use thiserror::Error;

/// Invalid or missing configuration. Aborts the run before any fetch.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no listing pages configured")]
    NoPages,

    #[error("no keywords configured")]
    NoKeywords,

    #[error("keyword {0:?} has no usable search terms")]
    EmptyKeyword(String),

    #[error("invalid listing URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid CSS selector for {field}: {selector:?}")]
    InvalidSelector { field: &'static str, selector: String },

    #[error("{0}")]
    Invalid(String),
}

/// A listing page could not be retrieved or rendered.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out waiting for {url} to render")]
    Timeout { url: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("browser task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A publish-date label that does not read as a Bangla calendar date.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnparsableDateError {
    #[error("no day in date label {0:?}")]
    MissingDay(String),

    #[error("no month name in date label {0:?}")]
    MissingMonth(String),

    #[error("unknown month name {month:?} in date label {text:?}")]
    UnknownMonth { month: String, text: String },

    #[error("no year in date label {0:?}")]
    MissingYear(String),

    #[error("day {day} of month {month} in year {year} is not a calendar date")]
    InvalidDate { year: u64, month: u32, day: u64 },

    #[error("relative date label {0:?} reaches past the calendar")]
    OutOfRange(String),
}
