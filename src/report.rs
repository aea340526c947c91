//! Rendering the tally for the console.
//!
//! Both formats list every keyword in configured order, zero counts
//! included, and depend only on the table contents.

use crate::driver::RunSummary;
use crate::filter::AggregationTable;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt::Write;

/// Plain text: a `label: count` line per keyword, each matched URL indented
/// beneath it.
pub fn render_text(summary: &RunSummary) -> String {
    let mut out = String::new();
    writeln!(out, "Disaster news published on {}", summary.target).unwrap();
    for bucket in summary.table.buckets() {
        writeln!(out, "{}: {}", bucket.keyword.label, bucket.count).unwrap();
        for url in &bucket.articles {
            writeln!(out, "  {url}").unwrap();
        }
    }
    out
}

/// Pretty JSON: `{ "<label>": { "count": n, "articles": [...] }, ... }`.
/// Bangla text is written as-is, not escaped.
pub fn render_json(summary: &RunSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&OrderedTally(&summary.table))
}

/// Serializes buckets as a map without losing keyword order.
struct OrderedTally<'a>(&'a AggregationTable);

impl Serialize for OrderedTally<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let buckets = self.0.buckets();
        let mut map = serializer.serialize_map(Some(buckets.len()))?;
        for bucket in buckets {
            map.serialize_entry(&bucket.keyword.label, bucket)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, Keyword};
    use chrono::NaiveDate;

    fn summary() -> RunSummary {
        let target = NaiveDate::from_ymd_opt(2024, 7, 14).unwrap();
        let mut table = AggregationTable::new(&[
            Keyword::plain("flood"),
            Keyword::plain("cyclone"),
            Keyword::plain("earthquake"),
        ]);
        for url in [
            "https://x.com/cyclone-dana",
            "https://x.com/flood-in-malda",
            "https://x.com/cyclone-relief",
        ] {
            table.ingest(
                &Article {
                    url: url.to_string(),
                    raw_date_text: "১৪ জুলাই ২০২৪".to_string(),
                    resolved_date: Some(target),
                },
                target,
            );
        }
        RunSummary {
            target,
            table,
            pages_fetched: 1,
            pages_failed: 0,
            teasers: 3,
            skipped_teasers: 0,
            unparsable_dates: 0,
            on_target: 3,
        }
    }

    #[test]
    fn test_text_report() {
        let expected = "\
Disaster news published on 2024-07-14
flood: 1
  https://x.com/flood-in-malda
cyclone: 2
  https://x.com/cyclone-dana
  https://x.com/cyclone-relief
earthquake: 0
";
        assert_eq!(render_text(&summary()), expected);
    }

    #[test]
    fn test_json_report_keeps_keyword_order() {
        let json = render_json(&summary()).unwrap();
        let flood = json.find("\"flood\"").unwrap();
        let cyclone = json.find("\"cyclone\"").unwrap();
        let earthquake = json.find("\"earthquake\"").unwrap();
        assert!(flood < cyclone && cyclone < earthquake);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["cyclone"]["count"], 2);
        assert_eq!(value["cyclone"]["articles"][1], "https://x.com/cyclone-relief");
        assert_eq!(value["earthquake"]["count"], 0);
        assert!(value["earthquake"]["articles"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_reports_are_deterministic() {
        assert_eq!(render_text(&summary()), render_text(&summary()));
        assert_eq!(render_json(&summary()).unwrap(), render_json(&summary()).unwrap());
    }
}
