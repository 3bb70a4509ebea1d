//! Progress derived from which fields of a record are present.

use crate::model::{ReportRecord, RunStatus};
use serde::Serialize;

/// Milestones and their progress weight, in pipeline order.
const WEIGHTS: [(Milestone, u8); 7] = [
    (Milestone::SiteData, 15),
    (Milestone::Keywords, 15),
    (Milestone::Competitors, 30),
    (Milestone::Patterns, 10),
    (Milestone::Gaps, 10),
    (Milestone::Recommendations, 10),
    (Milestone::Report, 10),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Milestone {
    SiteData,
    Keywords,
    Competitors,
    Patterns,
    Gaps,
    Recommendations,
    Report,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSteps {
    pub user_site_data: bool,
    pub discovered_keywords: bool,
    pub competitor_data: bool,
    pub patterns: bool,
    pub gaps: bool,
    pub recommendations: bool,
    pub report_data: bool,
}

impl CompletedSteps {
    fn get(&self, m: Milestone) -> bool {
        match m {
            Milestone::SiteData => self.user_site_data,
            Milestone::Keywords => self.discovered_keywords,
            Milestone::Competitors => self.competitor_data,
            Milestone::Patterns => self.patterns,
            Milestone::Gaps => self.gaps,
            Milestone::Recommendations => self.recommendations,
            Milestone::Report => self.report_data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunProgress {
    pub status: RunStatus,
    pub progress: u8,
    pub completed_steps: CompletedSteps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

pub fn progress(record: &ReportRecord) -> RunProgress {
    let steps = CompletedSteps {
        user_site_data: record.user_site_data.is_some(),
        discovered_keywords: record.discovered_keywords.is_some(),
        competitor_data: record.competitor_data.is_some(),
        patterns: record.patterns.is_some(),
        gaps: record.gaps.is_some(),
        recommendations: record.recommendations.is_some(),
        report_data: record.report_data.is_some(),
    };
    let progress = if record.status == RunStatus::Completed {
        100
    } else {
        WEIGHTS
            .iter()
            .filter(|(m, _)| steps.get(*m))
            .map(|(_, w)| *w)
            .sum::<u8>()
            .min(100)
    };
    RunProgress {
        status: record.status,
        progress,
        completed_steps: steps,
        failure_reason: record.failure_reason.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiscoveredKeywords, SiteData};
    use chrono::Utc;

    fn record() -> ReportRecord {
        ReportRecord {
            run_id: "seo_1_abcdefghi".into(),
            user_id: "u".into(),
            user_url: "https://acme.com".into(),
            target_keyword: "kanban".into(),
            created_at: Utc::now(),
            status: RunStatus::Analyzing,
            user_site_data: None,
            discovered_keywords: None,
            google_ranking: None,
            competitor_data: None,
            patterns: None,
            gaps: None,
            recommendations: None,
            score: None,
            report_data: None,
            failure_reason: None,
            payment_payer: None,
            payment_tx_hash: None,
        }
    }

    #[test]
    fn weights_accumulate() {
        let mut r = record();
        assert_eq!(progress(&r).progress, 0);
        r.user_site_data = Some(SiteData::default());
        r.discovered_keywords = Some(DiscoveredKeywords::default());
        assert_eq!(progress(&r).progress, 30);
        r.competitor_data = Some(vec![]);
        let p = progress(&r);
        assert_eq!(p.progress, 60);
        assert!(p.completed_steps.competitor_data);
        assert!(!p.completed_steps.patterns);
    }

    #[test]
    fn completed_is_always_100() {
        let mut r = record();
        r.status = RunStatus::Completed;
        assert_eq!(progress(&r).progress, 100);
    }

    #[test]
    fn failed_keeps_partial_progress_and_reason() {
        let mut r = record();
        r.status = RunStatus::Failed;
        r.user_site_data = Some(SiteData::default());
        r.failure_reason = Some("AI service error. Please try again.".into());
        let p = progress(&r);
        assert_eq!(p.progress, 15);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["completedSteps"]["userSiteData"], true);
        assert_eq!(json["failureReason"], "AI service error. Please try again.");
    }

    #[test]
    fn completed_steps_are_keyed_by_record_field() {
        let mut r = record();
        r.user_site_data = Some(SiteData::default());
        let json = serde_json::to_value(progress(&r).completed_steps).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        for key in [
            "userSiteData",
            "discoveredKeywords",
            "competitorData",
            "patterns",
            "gaps",
            "recommendations",
            "reportData",
        ] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(keys.len(), 7);
        assert_eq!(json["userSiteData"], true);
        assert_eq!(json["discoveredKeywords"], false);
    }
}
