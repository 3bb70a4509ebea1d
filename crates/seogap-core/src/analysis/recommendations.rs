//! Recommendation grouping and text structuring.

use crate::model::{Gap, GroupedRecommendations, Priority, StructuredRecommendation};
use once_cell::sync::Lazy;
use regex::Regex;

const ACTION_VERBS: &str = "Add|Incorporate|Expand|Consider|Implement|Create|Build|Develop|Improve|Enhance|Optimize|Update|Fix|Remove|Replace";

static ACTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)^({ACTION_VERBS})\s+(.+)")).unwrap());

const MAX_TITLE: usize = 80;
const MATCH_PREFIX: usize = 50;

/// Recommendation texts per bucket. Critical and high severities share the
/// high bucket, critical first; blank recommendations are skipped.
pub fn group_by_priority(gaps: &[Gap]) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut high = Vec::new();
    let mut medium = Vec::new();
    let mut low = Vec::new();
    let mut ordered: Vec<&Gap> = gaps.iter().collect();
    ordered.sort_by_key(|g| g.severity);
    for gap in ordered {
        let rec = gap.recommendation.trim();
        if rec.is_empty() {
            continue;
        }
        match gap.severity.priority() {
            Priority::High => high.push(rec.to_string()),
            Priority::Medium => medium.push(rec.to_string()),
            Priority::Low => low.push(rec.to_string()),
        }
    }
    (high, medium, low)
}

fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() > MAX_TITLE {
        format!("{}...", char_prefix(title, MAX_TITLE - 3).trim_end())
    } else {
        title.to_string()
    }
}

/// Turn one free-text recommendation into `{title, description, actionItems}`.
///
/// Heuristics, in order: a matching gap in the same bucket; a leading action
/// verb; a `title: description` split; the first sentence.
pub fn structure_one(text: &str, bucket: Priority, gaps: &[Gap]) -> Option<StructuredRecommendation> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let prefix = char_prefix(trimmed, MATCH_PREFIX);

    let gap = gaps.iter().find(|g| {
        g.severity.priority() == bucket
            && (g.recommendation.trim() == trimmed || g.recommendation.contains(prefix))
    });

    let (title, description, action_items) = if let Some(gap) = gap {
        (
            gap.category.trim().to_string(),
            gap.impact.trim().to_string(),
            vec![gap.recommendation.trim().to_string()],
        )
    } else if let Some(caps) = ACTION.captures(trimmed) {
        let first_clause = caps[2]
            .split(['.', ','])
            .next()
            .unwrap_or_default()
            .trim();
        (
            format!("{} {}", &caps[1], first_clause),
            trimmed.to_string(),
            vec![trimmed.to_string()],
        )
    } else if let Some((head, tail)) = trimmed.split_once(':') {
        let description = tail.trim().to_string();
        let item = if description.is_empty() {
            trimmed.to_string()
        } else {
            description.clone()
        };
        (head.trim().to_string(), description, vec![item])
    } else {
        let first_sentence = trimmed
            .split(['.', '!', '?'])
            .next()
            .unwrap_or_default();
        if first_sentence.chars().count() < MAX_TITLE {
            (
                first_sentence.trim().to_string(),
                trimmed[first_sentence.len()..]
                    .trim_start_matches(['.', '!', '?'])
                    .trim()
                    .to_string(),
                vec![trimmed.to_string()],
            )
        } else {
            (
                format!("{}...", char_prefix(trimmed, 60).trim_end()),
                trimmed.to_string(),
                vec![trimmed.to_string()],
            )
        }
    };

    let title = truncate_title(title.trim());
    Some(StructuredRecommendation {
        title: if title.is_empty() {
            "SEO Recommendation".to_string()
        } else {
            title
        },
        description: if description.trim().is_empty() {
            trimmed.to_string()
        } else {
            description
        },
        action_items: if action_items.iter().all(|a| a.trim().is_empty()) {
            vec![trimmed.to_string()]
        } else {
            action_items
        },
    })
}

pub fn structure(texts: &[String], bucket: Priority, gaps: &[Gap]) -> Vec<StructuredRecommendation> {
    texts
        .iter()
        .filter_map(|t| structure_one(t, bucket, gaps))
        .collect()
}

pub fn structure_all(
    high: &[String],
    medium: &[String],
    low: &[String],
    gaps: &[Gap],
) -> GroupedRecommendations {
    GroupedRecommendations {
        high_priority: structure(high, Priority::High, gaps),
        medium_priority: structure(medium, Priority::Medium, gaps),
        low_priority: structure(low, Priority::Low, gaps),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    fn gap(category: &str, severity: Severity, rec: &str) -> Gap {
        Gap {
            category: category.into(),
            severity,
            finding: "finding".into(),
            impact: format!("{category} impact"),
            recommendation: rec.into(),
            estimated_effort: None,
        }
    }

    #[test]
    fn grouping_merges_critical_into_high() {
        let gaps = vec![
            gap("A", Severity::High, "do a"),
            gap("B", Severity::Critical, "do b"),
            gap("C", Severity::Medium, "do c"),
            gap("D", Severity::Low, "   "),
            gap("E", Severity::Low, "do e"),
        ];
        let (high, medium, low) = group_by_priority(&gaps);
        assert_eq!(high, vec!["do b", "do a"]);
        assert_eq!(medium, vec!["do c"]);
        assert_eq!(low, vec!["do e"]);
    }

    #[test]
    fn matching_gap_supplies_title_and_description() {
        let gaps = vec![gap(
            "Content Depth",
            Severity::Critical,
            "Add 1200 more words covering pricing and onboarding",
        )];
        let r = structure_one(
            "Add 1200 more words covering pricing and onboarding",
            Priority::High,
            &gaps,
        )
        .unwrap();
        assert_eq!(r.title, "Content Depth");
        assert_eq!(r.description, "Content Depth impact");
        assert_eq!(r.action_items.len(), 1);
    }

    #[test]
    fn gap_in_other_bucket_is_ignored() {
        let gaps = vec![gap("Content Depth", Severity::Low, "Add FAQ schema, then test it")];
        let r = structure_one("Add FAQ schema, then test it", Priority::High, &gaps).unwrap();
        assert_eq!(r.title, "Add FAQ schema");
        assert_eq!(r.description, "Add FAQ schema, then test it");
    }

    #[test]
    fn action_verb_title_comes_from_first_line() {
        let text = "Add FAQ schema to the pricing page\nInclude questions: cost, trial length";
        let r = structure_one(text, Priority::Medium, &[]).unwrap();
        assert_eq!(r.title, "Add FAQ schema to the pricing page");
        assert_eq!(r.description, text);
    }

    #[test]
    fn colon_split() {
        let r = structure_one("Meta tags: rewrite the description", Priority::Low, &[]).unwrap();
        assert_eq!(r.title, "Meta tags");
        assert_eq!(r.description, "rewrite the description");
        assert_eq!(r.action_items, vec!["rewrite the description"]);
    }

    #[test]
    fn first_sentence_title() {
        let r = structure_one("Pages load slowly. Compress images.", Priority::Medium, &[]).unwrap();
        assert_eq!(r.title, "Pages load slowly");
        assert_eq!(r.description, "Compress images.");
    }

    #[test]
    fn long_text_gets_truncated_title() {
        let long = "word ".repeat(40);
        let r = structure_one(&long, Priority::Medium, &[]).unwrap();
        assert!(r.title.ends_with("..."));
        assert!(r.title.chars().count() <= 80);
        assert!(!r.description.is_empty());
        assert!(!r.action_items.is_empty());
    }

    #[test]
    fn blank_text_is_dropped() {
        assert!(structure_one("  ", Priority::Low, &[]).is_none());
        assert!(structure(&["".into(), "Fix it".into()], Priority::Low, &[]).len() == 1);
    }
}
