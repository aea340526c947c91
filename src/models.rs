//! Data models shared across the pipeline.
//!
//! - [`Teaser`]: a link and its raw date label, straight off a listing page
//! - [`Article`]: a teaser whose date label has been resolved (or not)
//! - [`Keyword`]: a report label and the URL substrings that count towards it

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// An article teaser as located on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Teaser {
    /// Absolute article URL.
    pub url: String,
    /// The publish-date label exactly as printed on the page.
    pub raw_date: String,
}

/// A teaser with its publish date resolved.
///
/// `resolved_date` is `None` when the date label could not be read. Such
/// articles never count towards any keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub url: String,
    pub raw_date_text: String,
    pub resolved_date: Option<NaiveDate>,
}

impl Article {
    pub fn new(teaser: Teaser, resolved_date: Option<NaiveDate>) -> Self {
        Self {
            url: teaser.url,
            raw_date_text: teaser.raw_date,
            resolved_date,
        }
    }
}

/// A keyword to tally.
///
/// In config files a keyword is either a bare string, which searches for
/// itself, or a labelled group of search terms:
///
/// ```yaml
/// keywords:
///   - flood
///   - label: fire
///     terms: [fire, blaze, inferno]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "KeywordSpec")]
pub struct Keyword {
    /// Name the tally is reported under.
    pub label: String,
    /// Substrings searched for in article URLs. Case sensitive.
    pub terms: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeywordSpec {
    Plain(String),
    Group { label: String, terms: Vec<String> },
}

impl From<KeywordSpec> for Keyword {
    fn from(spec: KeywordSpec) -> Self {
        match spec {
            KeywordSpec::Plain(term) => Keyword::plain(term),
            KeywordSpec::Group { label, terms } => Keyword { label, terms },
        }
    }
}

impl Keyword {
    /// A keyword whose only search term is its label.
    pub fn plain(term: impl Into<String>) -> Self {
        let term = term.into();
        Self {
            label: term.clone(),
            terms: vec![term],
        }
    }

    pub fn group(label: impl Into<String>, terms: &[&str]) -> Self {
        Self {
            label: label.into(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// True if any search term occurs anywhere in `url`. No word
    /// boundaries: `flood` matches `floodwater`.
    pub fn matches(&self, url: &str) -> bool {
        self.terms.iter().any(|term| url.contains(term.as_str()))
    }
}

/// The four disaster groups tallied when no keywords are configured.
pub fn default_keywords() -> Vec<Keyword> {
    vec![
        Keyword::group("flood", &["flood", "inundation", "waterlogging", "deluge"]),
        Keyword::group("fire", &["fire", "blaze", "inferno", "burn", "flames"]),
        Keyword::group("earthquake", &["earthquake", "tremor", "seismic"]),
        Keyword::group("cyclone", &["cyclone", "storm", "hurricane", "typhoon"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_match_without_word_boundary() {
        let kw = Keyword::plain("flood");
        assert!(kw.matches("https://example.com/state/floodwater-rises-in-malda/cid/1"));
        assert!(!kw.matches("https://example.com/state/fire-in-market/cid/2"));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let kw = Keyword::plain("flood");
        assert!(!kw.matches("https://example.com/FLOOD-alert"));
    }

    #[test]
    fn test_group_matches_any_term() {
        let kw = Keyword::group("cyclone", &["cyclone", "storm"]);
        assert!(kw.matches("https://example.com/thunderstorm-warning"));
        assert!(kw.matches("https://example.com/cyclone-dana"));
        assert!(!kw.matches("https://example.com/heatwave"));
    }

    #[test]
    fn test_keyword_deserializes_from_string_or_group() {
        let yaml = r#"
- flood
- label: fire
  terms: [fire, blaze]
"#;
        let keywords: Vec<Keyword> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(keywords[0], Keyword::plain("flood"));
        assert_eq!(keywords[1].label, "fire");
        assert_eq!(keywords[1].terms, vec!["fire", "blaze"]);
    }

    #[test]
    fn test_article_from_teaser() {
        let teaser = Teaser {
            url: "https://example.com/a".to_string(),
            raw_date: "১৪ জুলাই ২০২৪".to_string(),
        };
        let article = Article::new(teaser, NaiveDate::from_ymd_opt(2024, 7, 14));
        assert_eq!(article.url, "https://example.com/a");
        assert_eq!(article.raw_date_text, "১৪ জুলাই ২০২৪");
        assert!(article.resolved_date.is_some());
    }
}
