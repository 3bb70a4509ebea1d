use crate::model::{Headline, ReportRecord, RunStatus, StructuredRecommendation, StructuredReport};

fn escape_table_cell(input: &str) -> String {
    input.replace(['\r', '\n'], " ").replace('|', "\\|")
}

fn push_recommendations(md: &mut String, heading: &str, recs: &[StructuredRecommendation]) {
    if recs.is_empty() {
        return;
    }
    md.push_str(&format!("### {}\n\n", heading));
    for rec in recs {
        md.push_str(&format!("**{}**\n\n", rec.title));
        if rec.description != rec.title {
            md.push_str(&format!("{}\n\n", rec.description));
        }
        for item in &rec.action_items {
            md.push_str(&format!("- [ ] {}\n", item));
        }
        md.push('\n');
    }
}

fn headline_line(headline: &Headline) -> String {
    match headline {
        Headline::Ranking {
            google_ranking: Some(rank),
            google_ranking_url,
        } => match google_ranking_url {
            Some(url) => format!("**Google ranking:** #{} ({})", rank, url),
            None => format!("**Google ranking:** #{}", rank),
        },
        Headline::Ranking { .. } => "**Google ranking:** not in the top 100".to_string(),
        Headline::Score { score } => format!("**SEO score:** {}/100", score),
    }
}

fn render_report(md: &mut String, report: &StructuredReport) {
    let summary = &report.executive_summary;
    md.push_str("## Executive Summary\n\n");
    md.push_str(&format!("{}\n\n", headline_line(&summary.headline)));
    if !summary.overview.is_empty() {
        md.push_str(&format!("{}\n\n", summary.overview));
    }
    if !summary.key_findings.is_empty() {
        md.push_str("**Key findings:**\n\n");
        for finding in &summary.key_findings {
            md.push_str(&format!("- {}\n", finding));
        }
        md.push('\n');
    }

    let you = &report.your_metrics;
    let them = &report.competitor_benchmarks;
    md.push_str("## Metrics\n\n");
    md.push_str("| Metric | Your page | Competitor avg |\n");
    md.push_str("|--------|-----------|----------------|\n");
    md.push_str(&format!("| Words | {} | {} |\n", you.word_count, them.avg_word_count));
    md.push_str(&format!("| H2 headings | {} | {} |\n", you.h2_count, them.avg_h2_count));
    md.push_str(&format!("| H3 headings | {} | {} |\n", you.h3_count, them.avg_h3_count));
    md.push_str(&format!(
        "| Internal links | {} | {} |\n",
        you.internal_links, them.avg_internal_links
    ));
    md.push_str(&format!(
        "| External links | {} | {} |\n",
        you.external_links, them.avg_external_links
    ));
    md.push_str(&format!(
        "| Schema markup | {} | {}/{} |\n\n",
        if you.has_schema { "yes" } else { "no" },
        them.schema_usage,
        them.total_competitors
    ));

    if !report.gaps.is_empty() {
        md.push_str("## Gaps\n\n");
        md.push_str("| Severity | Category | Finding | Recommendation |\n");
        md.push_str("|----------|----------|---------|----------------|\n");
        for gap in &report.gaps {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                gap.severity,
                escape_table_cell(&gap.category),
                escape_table_cell(&gap.finding),
                escape_table_cell(&gap.recommendation)
            ));
        }
        md.push('\n');
    }

    md.push_str("## Recommendations\n\n");
    push_recommendations(md, "High priority", &report.recommendations.high_priority);
    push_recommendations(md, "Medium priority", &report.recommendations.medium_priority);
    push_recommendations(md, "Low priority", &report.recommendations.low_priority);

    let outline = &report.content_outline;
    md.push_str("## Content Outline\n\n");
    md.push_str(&format!("# {}\n\n", outline.recommended_h1));
    for (i, section) in outline.h2_sections.iter().enumerate() {
        md.push_str(&format!(
            "{}. **{}** (~{} words)",
            i + 1,
            section.title,
            section.estimated_word_count
        ));
        if !section.description.is_empty() {
            md.push_str(&format!(": {}", section.description));
        }
        md.push('\n');
    }
    md.push_str(&format!(
        "\nTotal estimated word count: {}\n\n",
        outline.total_estimated_word_count
    ));

    md.push_str("## Keywords\n\n");
    md.push_str(&format!("- Primary: {}\n", report.keywords.primary));
    if !report.keywords.secondary.is_empty() {
        md.push_str(&format!("- Secondary: {}\n", report.keywords.secondary.join(", ")));
    }
    md.push('\n');

    if !report.competitors.is_empty() {
        md.push_str("## Competitors\n\n");
        md.push_str("| # | Page | Words | H2s |\n");
        md.push_str("|---|------|-------|-----|\n");
        for c in &report.competitors {
            md.push_str(&format!(
                "| {} | [{}]({}) | {} | {} |\n",
                c.rank,
                escape_table_cell(&c.title),
                c.url,
                c.word_count,
                c.h2_count
            ));
        }
        md.push('\n');
    }
}

/// Render a stored run as a standalone markdown document.
pub fn to_markdown(record: &ReportRecord) -> String {
    let mut md = String::new();
    md.push_str(&format!("# SEO Gap Analysis: {}\n\n", record.user_url));
    md.push_str(&format!(
        "**Target keyword:** {}  \n**Run:** `{}`  \n**Created:** {}  \n**Status:** {}\n\n",
        record.target_keyword,
        record.run_id,
        record.created_at.format("%Y-%m-%d %H:%M UTC"),
        record.status
    ));

    match (&record.report_data, record.status) {
        (Some(report), _) => render_report(&mut md, report),
        (None, RunStatus::Failed) => {
            md.push_str(&format!(
                "Analysis failed: {}\n",
                record
                    .failure_reason
                    .as_deref()
                    .unwrap_or("no reason recorded")
            ));
        }
        (None, _) => md.push_str("Analysis is still in progress.\n"),
    }

    md.push_str(&format!("\n---\nGenerated by seogap v{}\n", env!("CARGO_PKG_VERSION")));
    md
}
