//! Synthetic 0-100 SEO score.

use crate::model::{Gap, Patterns, Severity, SiteData};

const BASE: i32 = 50;

/// `user / benchmark`, with a zero benchmark treated as "ahead" when the
/// user has anything and "behind" otherwise.
fn ratio(user: u64, benchmark: u64) -> f64 {
    if benchmark == 0 {
        if user > 0 {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        user as f64 / benchmark as f64
    }
}

fn word_count_points(r: f64) -> i32 {
    if r >= 1.2 {
        15
    } else if r >= 1.0 {
        10
    } else if r >= 0.8 {
        5
    } else {
        -5
    }
}

fn heading_points(r: f64) -> i32 {
    if r >= 1.0 {
        10
    } else if r >= 0.8 {
        5
    } else {
        -5
    }
}

fn internal_link_points(links: u64) -> i32 {
    match links {
        0..=9 => -5,
        10..=30 => 10,
        31..=50 => 5,
        _ => 0,
    }
}

fn severity_penalty(s: Severity) -> i32 {
    match s {
        Severity::Critical => 15,
        Severity::High => 12,
        Severity::Medium => 6,
        Severity::Low => 2,
    }
}

pub fn compute_score(site: &SiteData, patterns: &Patterns, gaps: &[Gap]) -> u8 {
    let mut score = BASE;

    score += word_count_points(ratio(site.word_count, patterns.avg_word_count));
    score += heading_points(ratio(site.h2.len() as u64, patterns.avg_h2_count));
    score += internal_link_points(site.internal_links);
    if site.has_schema {
        score += 10;
    }

    score -= gaps.iter().map(|g| severity_penalty(g.severity)).sum::<i32>();
    if gaps.len() > 8 {
        score -= 5;
    } else if gaps.len() > 6 {
        score -= 3;
    }

    score.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(words: u64, h2: usize, links: u64, schema: bool) -> SiteData {
        SiteData {
            word_count: words,
            h2: vec!["x".into(); h2],
            internal_links: links,
            has_schema: schema,
            ..Default::default()
        }
    }

    fn patterns(words: u64, h2: u64) -> Patterns {
        Patterns {
            avg_word_count: words,
            avg_h2_count: h2,
            ..Default::default()
        }
    }

    fn gaps(severity: Severity, n: usize) -> Vec<Gap> {
        (0..n)
            .map(|i| Gap {
                category: "Content Depth".into(),
                severity,
                finding: format!("f{i}"),
                impact: "i".into(),
                recommendation: "r".into(),
                estimated_effort: None,
            })
            .collect()
    }

    #[test]
    fn strong_page_without_gaps() {
        // 50 + 15 + 10 + 10 + 10
        assert_eq!(compute_score(&site(1500, 8, 20, true), &patterns(1000, 6), &[]), 95);
    }

    #[test]
    fn weak_page_with_mixed_gaps() {
        // 50 - 5 - 5 - 5 - (15 + 12 + 6 + 2)
        let mut g = gaps(Severity::Critical, 1);
        g.extend(gaps(Severity::High, 1));
        g.extend(gaps(Severity::Medium, 1));
        g.extend(gaps(Severity::Low, 1));
        assert_eq!(compute_score(&site(300, 1, 2, false), &patterns(1000, 6), &g), 0);

        let g = gaps(Severity::Low, 2);
        assert_eq!(compute_score(&site(300, 1, 2, false), &patterns(1000, 6), &g), 31);
    }

    #[test]
    fn ratio_thresholds() {
        // word ratio 1.0 -> +10, h2 ratio 0.8 -> +5, 40 links -> +5
        assert_eq!(compute_score(&site(1000, 4, 40, false), &patterns(1000, 5), &[]), 70);
        // word ratio 0.8 -> +5, h2 ratio 1.0, >50 links -> 0
        assert_eq!(compute_score(&site(800, 5, 80, false), &patterns(1000, 5), &[]), 65);
    }

    #[test]
    fn gap_count_penalties() {
        let base = compute_score(&site(1000, 5, 20, false), &patterns(1000, 5), &[]);
        assert_eq!(base, 80);
        assert_eq!(
            compute_score(&site(1000, 5, 20, false), &patterns(1000, 5), &gaps(Severity::Low, 7)),
            80 - 14 - 3
        );
        assert_eq!(
            compute_score(&site(1000, 5, 20, false), &patterns(1000, 5), &gaps(Severity::Low, 9)),
            80 - 18 - 5
        );
    }

    #[test]
    fn zero_benchmarks() {
        // user has content: treated as ahead
        assert_eq!(compute_score(&site(10, 1, 20, false), &patterns(0, 0), &[]), 85);
        // user has nothing either: treated as behind
        assert_eq!(compute_score(&site(0, 0, 20, false), &patterns(0, 0), &[]), 50);
    }

    #[test]
    fn clamped_to_range() {
        let g = gaps(Severity::Critical, 50);
        assert_eq!(compute_score(&site(0, 0, 0, false), &patterns(1000, 5), &g), 0);
        assert!(compute_score(&site(9999, 50, 20, true), &patterns(1, 1), &[]) <= 100);
    }
}
