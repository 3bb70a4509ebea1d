//! Assembly of the structured report (`reportData`) from stage outputs.

use crate::analysis::outline::parse_content_outline;
use crate::analysis::recommendations::structure_all;
use crate::model::{
    CompetitorBenchmarks, CompetitorPage, CompetitorSummary, DiscoveredKeywords, ExecutiveSummary,
    Gap, Headline, KeywordSummary, Patterns, Recommendations, Severity, SiteData, SiteMetrics,
    StructuredReport,
};

const KEY_FINDINGS: usize = 5;

/// Everything the report is built from.
pub struct ReportInputs<'a> {
    pub user_url: &'a str,
    pub target_keyword: &'a str,
    pub site: &'a SiteData,
    pub keywords: Option<&'a DiscoveredKeywords>,
    pub competitors: &'a [CompetitorPage],
    pub patterns: &'a Patterns,
    pub gaps: &'a [Gap],
    pub recommendations: &'a Recommendations,
    pub headline: Headline,
}

/// Used when the model returns an empty overview.
pub fn fallback_overview(inputs: &ReportInputs<'_>) -> String {
    let urgent = inputs
        .gaps
        .iter()
        .filter(|g| matches!(g.severity, Severity::Critical | Severity::High))
        .count();
    let position = match &inputs.headline {
        Headline::Ranking {
            google_ranking: Some(rank),
            ..
        } => format!("currently ranks at position #{rank}"),
        Headline::Ranking { .. } => "is not ranking in the top 100 results".to_string(),
        Headline::Score { score } => format!("scores {score}/100"),
    };
    format!(
        "{} {} for \"{}\". The analysis found {} gaps, {} of them high priority, against {} competitor pages.",
        inputs.user_url,
        position,
        inputs.target_keyword,
        inputs.gaps.len(),
        urgent,
        inputs.patterns.technical_patterns.total_competitors,
    )
}

pub fn assemble(inputs: &ReportInputs<'_>, overview: String) -> StructuredReport {
    let overview = if overview.trim().is_empty() {
        fallback_overview(inputs)
    } else {
        overview.trim().to_string()
    };

    let recs = inputs.recommendations;
    let keywords = match inputs.keywords {
        Some(k) if !k.primary.trim().is_empty() => KeywordSummary {
            primary: k.primary.clone(),
            secondary: k.secondary.clone(),
        },
        Some(k) => KeywordSummary {
            primary: inputs.target_keyword.to_string(),
            secondary: k.secondary.clone(),
        },
        None => KeywordSummary {
            primary: inputs.target_keyword.to_string(),
            secondary: Vec::new(),
        },
    };

    StructuredReport {
        executive_summary: ExecutiveSummary {
            overview,
            key_findings: inputs
                .gaps
                .iter()
                .take(KEY_FINDINGS)
                .map(|g| g.finding.clone())
                .collect(),
            headline: inputs.headline.clone(),
        },
        your_metrics: SiteMetrics::from(inputs.site),
        competitor_benchmarks: CompetitorBenchmarks::from(inputs.patterns),
        gaps: inputs.gaps.to_vec(),
        recommendations: structure_all(
            &recs.high_priority,
            &recs.medium_priority,
            &recs.low_priority,
            inputs.gaps,
        ),
        content_outline: parse_content_outline(&recs.content_outline),
        keywords,
        competitors: inputs
            .competitors
            .iter()
            .map(|c| CompetitorSummary {
                rank: c.rank,
                url: c.url.clone(),
                title: if c.data.title.trim().is_empty() {
                    c.url.clone()
                } else {
                    c.data.title.clone()
                },
                word_count: c.data.word_count,
                h2_count: c.data.h2.len() as u64,
            })
            .collect(),
    }
}
