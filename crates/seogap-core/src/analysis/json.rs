//! Lenient decoding of LLM JSON output.

use crate::model::{Gap, Severity};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// First JSON value in `text`, skipping any prose or code fences before it.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let text = text.trim();
    if let Ok(v) = serde_json::from_str(text) {
        return Some(v);
    }
    let start = text.find(['{', '['])?;
    serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<serde_json::Value>()
        .next()?
        .ok()
}

/// Decode `text` as `T`, or return `fallback` (logged) when it is not valid.
pub fn parse_or<T: DeserializeOwned>(text: &str, fallback: T, what: &str) -> T {
    let Some(value) = extract_json(text) else {
        warn!(task = what, "LLM returned no JSON; using fallback");
        return fallback;
    };
    match serde_json::from_value(value) {
        Ok(v) => v,
        Err(e) => {
            warn!(task = what, error = %e, "LLM JSON did not match expected shape; using fallback");
            fallback
        }
    }
}

/// Gap as the LLM writes it: severity is free text and fields may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RawGap {
    /// e.g. "Content Depth", "Content Structure", "Technical SEO", "Topic Coverage", "On-Page Optimization"
    pub category: String,
    /// One of: critical, high, medium, low
    pub severity: String,
    pub finding: String,
    pub impact: String,
    pub recommendation: String,
    pub estimated_effort: Option<String>,
}

impl RawGap {
    /// `None` when the gap has no recommendation. Unknown severities become
    /// `medium`.
    pub fn normalize(self) -> Option<Gap> {
        let recommendation = self.recommendation.trim().to_string();
        if recommendation.is_empty() {
            return None;
        }
        let severity = Severity::parse_lenient(&self.severity).unwrap_or_else(|| {
            warn!(severity = %self.severity, "unknown gap severity; using medium");
            Severity::Medium
        });
        let category = self.category.trim();
        Some(Gap {
            category: if category.is_empty() {
                "General".to_string()
            } else {
                category.to_string()
            },
            severity,
            finding: self.finding.trim().to_string(),
            impact: self.impact.trim().to_string(),
            recommendation,
            estimated_effort: self
                .estimated_effort
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
        })
    }
}

pub fn normalize_gaps(raw: Vec<RawGap>) -> Vec<Gap> {
    raw.into_iter().filter_map(RawGap::normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Topics {
        #[serde(rename = "commonTopics", default)]
        common_topics: Vec<String>,
    }

    #[test]
    fn plain_json() {
        let t: Topics = parse_or(r#"{"commonTopics": ["a", "b"]}"#, Topics::default(), "t");
        assert_eq!(t.common_topics, vec!["a", "b"]);
    }

    #[test]
    fn json_inside_prose_and_fences() {
        let text = "Sure! Here you go:\n```json\n{\"commonTopics\": [\"pricing\"]}\n```\nAnything else?";
        let t: Topics = parse_or(text, Topics::default(), "t");
        assert_eq!(t.common_topics, vec!["pricing"]);
    }

    #[test]
    fn malformed_json_uses_fallback() {
        let fallback = Topics {
            common_topics: vec!["fallback".into()],
        };
        let t: Topics = parse_or("{\"commonTopics\": [", fallback, "t");
        assert_eq!(t.common_topics, vec!["fallback"]);

        let t: Topics = parse_or("no json at all", Topics::default(), "t");
        assert!(t.common_topics.is_empty());

        let t: Topics = parse_or(r#"{"commonTopics": "x"}"#, Topics::default(), "t");
        assert!(t.common_topics.is_empty());
    }

    #[test]
    fn gaps_are_normalized() {
        let raw: Vec<RawGap> = serde_json::from_value(serde_json::json!([
            {"category": "Content Depth", "severity": "HIGH", "finding": "f", "impact": "i",
             "recommendation": " Add words ", "estimatedEffort": "Medium (1-4 weeks)"},
            {"category": "", "severity": "urgent", "recommendation": "Fix titles"},
            {"category": "Noise", "severity": "low", "recommendation": ""}
        ]))
        .unwrap();
        let gaps = normalize_gaps(raw);
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].severity, Severity::High);
        assert_eq!(gaps[0].recommendation, "Add words");
        assert_eq!(gaps[1].severity, Severity::Medium);
        assert_eq!(gaps[1].category, "General");
        assert!(gaps[1].estimated_effort.is_none());
    }
}
