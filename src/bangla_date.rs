//! Bangla publish-date labels to Gregorian dates.
//!
//! Listing pages print dates the way a Bangla reader writes them:
//! Bangla numerals, a Bangla spelling of the Gregorian month, and often a
//! weekday and a clock time around them, e.g. `বুধবার, ১৪ অগস্ট ২০২৪ ১০:২৩`.
//! Fresh teasers are labelled relatively instead (`৩ ঘণ্টা আগে`).
//!
//! [`parse_bangla_date`] handles absolute labels; [`resolve_date`] also
//! understands the relative forms and needs the current time for that.

use crate::error::UnparsableDateError;
use chrono::{Days, NaiveDate, NaiveDateTime, TimeDelta};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Bangla digit glyphs, indexed by their value.
const BANGLA_DIGITS: [char; 10] = ['০', '১', '২', '৩', '৪', '৫', '৬', '৭', '৮', '৯'];

/// Month spellings seen on Bangla news sites, with their ordinal.
const MONTHS: &[(&str, u32)] = &[
    ("জানুয়ারি", 1),
    ("জানুয়ারী", 1),
    ("জানু", 1),
    ("ফেব্রুয়ারি", 2),
    ("ফেব্রুয়ারী", 2),
    ("ফেব্রু", 2),
    ("মার্চ", 3),
    ("এপ্রিল", 4),
    ("মে", 5),
    ("জুন", 6),
    ("জুলাই", 7),
    ("আগস্ট", 8),
    ("অগস্ট", 8),
    ("আগষ্ট", 8),
    ("সেপ্টেম্বর", 9),
    ("সেপ্টেম্বার", 9),
    ("অক্টোবর", 10),
    ("নভেম্বর", 11),
    ("ডিসেম্বর", 12),
];

/// Endings of spelled-out ordinal days.
const ORDINAL_SUFFIXES: &[&str] = &["লা", "রা", "ঠা", "শে", "ই"];

/// Tokens that never carry date information.
const NOISE: &[&str] = &[
    // weekdays, long and short
    "রবিবার", "সোমবার", "মঙ্গলবার", "বুধবার", "বৃহস্পতিবার", "শুক্রবার", "শনিবার",
    "রবি", "সোম", "মঙ্গল", "বুধ", "বৃহস্পতি", "বৃহঃ", "শুক্র", "শনি",
    // time of day
    "সকাল", "বিকেল", "বিকাল", "সন্ধ্যা", "রাত", "দুপুর", "ভোর", "am", "pm",
    // byline words
    "প্রকাশিত", "প্রকাশ", "শেষ", "আপডেট", "তারিখ",
];

static MONTH_TABLE: Lazy<HashMap<String, u32>> = Lazy::new(|| {
    MONTHS
        .iter()
        .map(|(name, ordinal)| (canonicalize(name), *ordinal))
        .collect()
});

static NOISE_TABLE: Lazy<Vec<String>> = Lazy::new(|| NOISE.iter().map(|w| canonicalize(w)).collect());

static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9০-৯]{1,2}:[0-9০-৯]{2}(:[0-9০-৯]{2})?").unwrap());

/// Translate one Bangla numeral glyph to its ASCII digit.
pub fn bangla_digit_to_ascii(c: char) -> Option<char> {
    BANGLA_DIGITS
        .iter()
        .position(|&g| g == c)
        .and_then(|value| char::from_digit(value as u32, 10))
}

/// Replace every Bangla numeral in `text` with its ASCII digit, leaving
/// everything else untouched.
pub fn translate_numerals(text: &str) -> String {
    text.chars()
        .map(|c| bangla_digit_to_ascii(c).unwrap_or(c))
        .collect()
}

/// Parse a run of Bangla or ASCII digits as a literal integer.
///
/// Saturates instead of overflowing so an absurd digit run still surfaces
/// as an invalid date rather than a different number.
pub fn parse_number(token: &str) -> Option<u64> {
    let digits = translate_numerals(token);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(digits.bytes().fold(0u64, |acc, b| {
        acc.saturating_mul(10).saturating_add(u64::from(b - b'0'))
    }))
}

/// Parse a day of the month, which may carry an ordinal suffix
/// (`১লা`, `২রা`, `৪ঠা`, `১৫ই`, `২১শে`).
pub fn parse_day(token: &str) -> Option<u64> {
    let bare = ORDINAL_SUFFIXES
        .iter()
        .find_map(|suffix| token.strip_suffix(suffix))
        .unwrap_or(token);
    parse_number(bare)
}

/// Look up the ordinal of a Bangla month name.
pub fn month_number(name: &str) -> Option<u32> {
    MONTH_TABLE.get(&canonicalize(name)).copied()
}

/// Convert an absolute Bangla date label to a Gregorian date.
///
/// The day is the number just before the month name, ordinal suffix
/// allowed, and the year the first number after it. A label written month-first (`জুলাই ১৪, ২০২৪`) takes
/// the two numbers after the month as day and year.
pub fn parse_bangla_date(text: &str) -> Result<NaiveDate, UnparsableDateError> {
    let tokens = date_tokens(text);

    let Some(month_idx) = tokens.iter().position(|t| month_number(t).is_some()) else {
        return match tokens.iter().find(|t| parse_day(t).is_none()) {
            Some(word) => Err(UnparsableDateError::UnknownMonth {
                month: word.clone(),
                text: text.to_string(),
            }),
            None => Err(UnparsableDateError::MissingMonth(text.to_string())),
        };
    };
    let month = month_number(&tokens[month_idx]).unwrap_or_default();

    let before: Vec<u64> = tokens[..month_idx].iter().filter_map(|t| parse_day(t)).collect();
    let after: Vec<u64> = tokens[month_idx + 1..].iter().filter_map(|t| parse_day(t)).collect();

    let (day, year) = match (before.last(), after.as_slice()) {
        (Some(&day), [year, ..]) => (day, *year),
        (Some(_), []) => return Err(UnparsableDateError::MissingYear(text.to_string())),
        (None, [day, year, ..]) => (*day, *year),
        (None, _) => return Err(UnparsableDateError::MissingDay(text.to_string())),
    };

    compose(year, month, day)
}

/// Resolve a publish-date label, relative or absolute, against `now`, the
/// moment the run started.
///
/// `আজ` and `এইমাত্র` resolve to the day of `now`, `গতকাল` to the day
/// before. Seconds, minutes and hours ago are subtracted from `now` itself,
/// so `৩ ঘণ্টা আগে` read at 01:00 lands on the previous day. `N দিন আগে`
/// and `N সপ্তাহ আগে` step back whole days. Everything else goes through
/// [`parse_bangla_date`].
pub fn resolve_date(text: &str, now: NaiveDateTime) -> Result<NaiveDate, UnparsableDateError> {
    let out_of_range = || UnparsableDateError::OutOfRange(text.to_string());
    match relative_label(text) {
        Some(Ago::Seconds(secs)) => i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|elapsed| now.checked_sub_signed(elapsed))
            .map(|then| then.date())
            .ok_or_else(out_of_range),
        Some(Ago::Days(days)) => now
            .date()
            .checked_sub_days(Days::new(days))
            .ok_or_else(out_of_range),
        None => parse_bangla_date(text),
    }
}

/// How far back a relative label points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ago {
    Seconds(u64),
    Days(u64),
}

/// Read a relative label, or `None` if the label is not relative.
fn relative_label(text: &str) -> Option<Ago> {
    let tokens: Vec<String> = split_words(&canonicalize(text));

    if tokens.iter().any(|t| t == &canonicalize("এইমাত্র") || t == &canonicalize("আজ")) {
        return Some(Ago::Days(0));
    }
    if tokens.iter().any(|t| t == &canonicalize("গতকাল")) {
        return Some(Ago::Days(1));
    }

    let ago = tokens.iter().position(|t| t == &canonicalize("আগে"))?;
    let unit = tokens.get(ago.checked_sub(1)?)?;
    let count = ago
        .checked_sub(2)
        .and_then(|i| tokens.get(i))
        .and_then(|t| parse_number(t))
        .unwrap_or(1);

    match unit.as_str() {
        u if is_one_of(u, &["সেকেন্ড"]) => Some(Ago::Seconds(count)),
        u if is_one_of(u, &["মিনিট"]) => Some(Ago::Seconds(count.saturating_mul(60))),
        u if is_one_of(u, &["ঘণ্টা", "ঘন্টা"]) => Some(Ago::Seconds(count.saturating_mul(3600))),
        u if is_one_of(u, &["দিন"]) => Some(Ago::Days(count)),
        u if is_one_of(u, &["সপ্তাহ"]) => Some(Ago::Days(count.saturating_mul(7))),
        _ => None,
    }
}

fn is_one_of(token: &str, words: &[&str]) -> bool {
    words.iter().any(|w| canonicalize(w) == token)
}

fn compose(year: u64, month: u32, day: u64) -> Result<NaiveDate, UnparsableDateError> {
    let invalid = UnparsableDateError::InvalidDate { year, month, day };
    let y = i32::try_from(year).map_err(|_| invalid.clone())?;
    let d = u32::try_from(day).map_err(|_| invalid.clone())?;
    NaiveDate::from_ymd_opt(y, month, d).ok_or(invalid)
}

/// Canonical tokens of an absolute date label: clock times and noise words
/// removed, punctuation split away.
fn date_tokens(text: &str) -> Vec<String> {
    let canonical = canonicalize(text);
    let without_clock = CLOCK_TIME.replace_all(&canonical, " ");
    split_words(&without_clock)
        .into_iter()
        .filter(|t| !NOISE_TABLE.iter().any(|n| n == t))
        .collect()
}

fn split_words(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || matches!(c, ',' | '।' | '|' | '-' | '/' | ':' | '(' | ')' | '.'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Decompose the precomposed nukta letters and drop zero-width joiners so
/// `য়` typed either way compares equal. ASCII is lowercased.
fn canonicalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{09DC}' => out.push_str("\u{09A1}\u{09BC}"),
            '\u{09DD}' => out.push_str("\u{09A2}\u{09BC}"),
            '\u{09DF}' => out.push_str("\u{09AF}\u{09BC}"),
            '\u{200C}' | '\u{200D}' => {}
            c if c.is_ascii() => out.push(c.to_ascii_lowercase()),
            c => out.push(c),
        }
    }
    out
}
