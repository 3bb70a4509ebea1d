//! Competitor aggregate statistics.

use crate::model::{CompetitorPage, Patterns, TechnicalPatterns};
use serde::Serialize;

fn rounded_mean(values: impl Iterator<Item = u64>, n: usize) -> u64 {
    if n == 0 {
        return 0;
    }
    let sum: u64 = values.sum();
    (sum as f64 / n as f64).round() as u64
}

/// Rounded means over competitors with a non-zero word count.
///
/// `common_topics` is left empty; it comes from the LLM.
pub fn aggregate(competitors: &[CompetitorPage]) -> Patterns {
    let live: Vec<&CompetitorPage> = competitors
        .iter()
        .filter(|c| c.data.word_count > 0)
        .collect();
    let n = live.len();
    let schema_usage = live.iter().filter(|c| c.data.has_schema).count();

    Patterns {
        avg_word_count: rounded_mean(live.iter().map(|c| c.data.word_count), n),
        avg_h2_count: rounded_mean(live.iter().map(|c| c.data.h2.len() as u64), n),
        avg_h3_count: rounded_mean(live.iter().map(|c| c.data.h3.len() as u64), n),
        avg_internal_links: rounded_mean(live.iter().map(|c| c.data.internal_links), n),
        avg_external_links: rounded_mean(live.iter().map(|c| c.data.external_links), n),
        common_topics: Vec::new(),
        technical_patterns: TechnicalPatterns {
            schema_usage: schema_usage as u32,
            total_competitors: n as u32,
        },
        schema_adoption: if n == 0 {
            0.0
        } else {
            schema_usage as f64 / n as f64
        },
    }
}

/// Per-page summary sent to the LLM for topic extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSample {
    pub title: String,
    pub h2_topics: Vec<String>,
    pub word_count: u64,
}

/// The `limit` best-ranked competitors, summarized for topic extraction.
pub fn topic_samples(competitors: &[CompetitorPage], limit: usize) -> Vec<TopicSample> {
    let mut sorted: Vec<&CompetitorPage> = competitors.iter().collect();
    sorted.sort_by_key(|c| c.rank);
    sorted
        .into_iter()
        .take(limit)
        .map(|c| TopicSample {
            title: c.data.title.clone(),
            h2_topics: c.data.h2.iter().take(10).cloned().collect(),
            word_count: c.data.word_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SiteData;

    fn page(rank: u32, words: u64, h2: usize, schema: bool) -> CompetitorPage {
        CompetitorPage {
            keyword: "kw".into(),
            rank,
            url: format!("https://c{rank}.test"),
            data: SiteData {
                title: format!("c{rank}"),
                word_count: words,
                h2: (0..h2).map(|i| format!("h{i}")).collect(),
                internal_links: 10 * rank as u64,
                has_schema: schema,
                ..Default::default()
            },
        }
    }

    #[test]
    fn averages_are_rounded_means() {
        let p = aggregate(&[page(1, 1000, 3, true), page(2, 1501, 4, false)]);
        assert_eq!(p.avg_word_count, 1251);
        assert_eq!(p.avg_h2_count, 4); // 3.5 rounds up
        assert_eq!(p.avg_internal_links, 15);
        assert_eq!(p.technical_patterns.schema_usage, 1);
        assert_eq!(p.technical_patterns.total_competitors, 2);
        assert!((p.schema_adoption - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_word_pages_are_excluded() {
        let p = aggregate(&[page(1, 900, 2, false), page(2, 0, 9, true)]);
        assert_eq!(p.avg_word_count, 900);
        assert_eq!(p.avg_h2_count, 2);
        assert_eq!(p.technical_patterns.total_competitors, 1);
        assert_eq!(p.technical_patterns.schema_usage, 0);
    }

    #[test]
    fn no_competitors_gives_zeroes() {
        let p = aggregate(&[]);
        assert_eq!(p.avg_word_count, 0);
        assert_eq!(p.technical_patterns.total_competitors, 0);
        assert_eq!(p.schema_adoption, 0.0);
    }

    #[test]
    fn topic_samples_use_best_ranks() {
        let pages: Vec<_> = [7, 2, 9, 1, 5, 3].iter().map(|&r| page(r, 100, 12, false)).collect();
        let samples = topic_samples(&pages, 5);
        let titles: Vec<_> = samples.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["c1", "c2", "c3", "c5", "c7"]);
        assert_eq!(samples[0].h2_topics.len(), 10);
    }
}
