//! Keyword filtering and the running tally.

use crate::models::{Article, Keyword};
use chrono::NaiveDate;
use serde::Serialize;

/// Matching URLs per keyword, in configured keyword order.
///
/// Append only. Every URL in a bucket belongs to an article published on the
/// target date; [`AggregationTable::ingest`] is the only way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationTable {
    buckets: Vec<Bucket>,
}

/// One keyword's tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    #[serde(skip)]
    pub keyword: Keyword,
    pub count: usize,
    /// URLs in discovery order. Repeated teasers are kept.
    pub articles: Vec<String>,
}

impl AggregationTable {
    /// An empty table with one bucket per keyword.
    pub fn new(keywords: &[Keyword]) -> Self {
        Self {
            buckets: keywords
                .iter()
                .cloned()
                .map(|keyword| Bucket {
                    keyword,
                    count: 0,
                    articles: Vec::new(),
                })
                .collect(),
        }
    }

    /// File `article` under every keyword its URL matches, if it was
    /// published on `target`. Returns how many buckets it went into.
    pub fn ingest(&mut self, article: &Article, target: NaiveDate) -> usize {
        if article.resolved_date != Some(target) {
            return 0;
        }

        let mut filed = 0;
        for bucket in &mut self.buckets {
            if bucket.keyword.matches(&article.url) {
                bucket.articles.push(article.url.clone());
                bucket.count += 1;
                filed += 1;
            }
        }
        filed
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    #[cfg(test)]
    pub fn get(&self, label: &str) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.keyword.label == label)
    }

    /// Total URLs across all buckets, counting multi-keyword articles once
    /// per keyword.
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    fn article(url: &str, date: Option<NaiveDate>) -> Article {
        Article {
            url: url.to_string(),
            raw_date_text: String::new(),
            resolved_date: date,
        }
    }

    fn table() -> AggregationTable {
        AggregationTable::new(&[Keyword::plain("cyclone"), Keyword::plain("flood")])
    }

    #[test]
    fn test_only_target_date_is_counted() {
        let mut t = table();
        let target = day(14);
        assert_eq!(t.ingest(&article("https://x.com/cyclone-a", Some(day(14))), target), 1);
        assert_eq!(t.ingest(&article("https://x.com/cyclone-b", Some(day(15))), target), 0);
        assert_eq!(t.ingest(&article("https://x.com/cyclone-c", Some(day(13))), target), 0);
        assert_eq!(t.ingest(&article("https://x.com/cyclone-d", None), target), 0);

        assert_eq!(t.get("cyclone").unwrap().articles, vec!["https://x.com/cyclone-a"]);
        assert_eq!(t.get("flood").unwrap().count, 0);
    }

    #[test]
    fn test_every_tallied_url_is_from_target_date() {
        let target = day(14);
        let articles = vec![
            article("https://x.com/flood-1", Some(day(14))),
            article("https://x.com/flood-2", Some(day(12))),
            article("https://x.com/cyclone-flood", Some(day(14))),
            article("https://x.com/cyclone-3", None),
            article("https://x.com/cyclone-4", Some(day(15))),
        ];
        let mut t = table();
        for a in &articles {
            t.ingest(a, target);
        }
        for bucket in t.buckets() {
            for url in &bucket.articles {
                let source = articles.iter().find(|a| &a.url == url).unwrap();
                assert_eq!(source.resolved_date, Some(target));
            }
        }
        assert_eq!(t.total(), 3);
    }

    #[test]
    fn test_article_can_match_several_keywords() {
        let mut t = table();
        let filed = t.ingest(&article("https://x.com/cyclone-brings-flood", Some(day(14))), day(14));
        assert_eq!(filed, 2);
        assert_eq!(t.get("cyclone").unwrap().count, 1);
        assert_eq!(t.get("flood").unwrap().count, 1);
    }

    #[test]
    fn test_substring_match_inside_longer_word() {
        let mut t = table();
        t.ingest(&article("https://x.com/floodwater-in-malda", Some(day(14))), day(14));
        assert_eq!(t.get("flood").unwrap().count, 1);
    }

    #[test]
    fn test_group_counts_article_once() {
        let mut t = AggregationTable::new(&[Keyword::group("cyclone", &["cyclone", "storm"])]);
        t.ingest(&article("https://x.com/cyclone-storm-surge", Some(day(14))), day(14));
        assert_eq!(t.get("cyclone").unwrap().count, 1);
    }

    #[test]
    fn test_repeated_url_is_not_deduplicated() {
        let mut t = table();
        let a = article("https://x.com/flood-1", Some(day(14)));
        t.ingest(&a, day(14));
        t.ingest(&a, day(14));
        assert_eq!(t.get("flood").unwrap().articles.len(), 2);
    }

    #[test]
    fn test_buckets_follow_keyword_order() {
        let t = table();
        let labels: Vec<&str> = t.buckets().iter().map(|b| b.keyword.label.as_str()).collect();
        assert_eq!(labels, vec!["cyclone", "flood"]);
    }
}
