//! Plain-text diagnostic summary of a stored run (`reports inspect`).

use crate::model::{ReportRecord, Severity};

fn check(present: bool) -> &'static str {
    if present {
        "ok"
    } else {
        "missing"
    }
}

/// Severity counts in `Severity::ALL` order.
pub fn severity_counts(record: &ReportRecord) -> Vec<(Severity, usize)> {
    let gaps = record.gaps.as_deref().unwrap_or_default();
    Severity::ALL
        .iter()
        .map(|s| (*s, gaps.iter().filter(|g| g.severity == *s).count()))
        .collect()
}

pub fn inspect(record: &ReportRecord) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Run: {}", record.run_id));
    lines.push(format!("  Status: {}", record.status));
    lines.push(format!("  URL: {}", record.user_url));
    lines.push(format!("  Target keyword: {}", record.target_keyword));
    lines.push(format!(
        "  Created: {}",
        record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(score) = record.score {
        lines.push(format!("  Score: {}/100", score));
    }
    if let Some(reason) = &record.failure_reason {
        lines.push(format!("  Failure: {}", reason));
    }
    if let Some(tx) = &record.payment_tx_hash {
        lines.push(format!("  Payment tx: {}", tx));
    }

    lines.push(String::new());
    lines.push("Keywords:".to_string());
    match &record.discovered_keywords {
        Some(k) => {
            lines.push(format!("  Primary: \"{}\"", k.primary));
            let secondary = if k.secondary.is_empty() {
                "None".to_string()
            } else {
                k.secondary.join(", ")
            };
            lines.push(format!("  Secondary: {}", secondary));
        }
        None => lines.push("  (none recorded)".to_string()),
    }

    lines.push(String::new());
    lines.push("Gaps:".to_string());
    match &record.gaps {
        Some(gaps) => {
            lines.push(format!("  Total: {}", gaps.len()));
            for (severity, n) in severity_counts(record) {
                lines.push(format!("  {}: {}", severity, n));
            }
            for (i, gap) in gaps.iter().enumerate() {
                lines.push(format!(
                    "  {}. [{}] {}: {}",
                    i + 1,
                    gap.severity.as_str().to_uppercase(),
                    gap.category,
                    gap.finding
                ));
            }
        }
        None => lines.push("  (none recorded)".to_string()),
    }

    lines.push(String::new());
    lines.push("Report data:".to_string());
    match &record.report_data {
        Some(r) => {
            lines.push(format!(
                "  Executive summary: {}",
                check(!r.executive_summary.overview.is_empty())
            ));
            lines.push(format!(
                "  Key findings: {}",
                r.executive_summary.key_findings.len()
            ));
            lines.push(format!("  Gaps: {}", r.gaps.len()));
            lines.push(format!(
                "  Recommendations: {} high / {} medium / {} low",
                r.recommendations.high_priority.len(),
                r.recommendations.medium_priority.len(),
                r.recommendations.low_priority.len()
            ));
            lines.push(format!(
                "  Content outline: {} sections",
                r.content_outline.h2_sections.len()
            ));
            lines.push(format!("  Keywords: primary \"{}\"", r.keywords.primary));
            lines.push(format!("  Competitors: {}", r.competitors.len()));
        }
        None => lines.push("  (not generated)".to_string()),
    }

    if let (Some(site), Some(patterns)) = (&record.user_site_data, &record.patterns) {
        lines.push(String::new());
        lines.push("Metrics comparison:".to_string());
        lines.push(format!("  Your word count: {}", site.word_count));
        lines.push(format!("  Competitor avg: {}", patterns.avg_word_count));
        let diff = site.word_count as i64 - patterns.avg_word_count as i64;
        if patterns.avg_word_count > 0 {
            let pct = (site.word_count as f64 / patterns.avg_word_count as f64 - 1.0) * 100.0;
            lines.push(format!("  Difference: {} ({:.1}%)", diff, pct));
        } else {
            lines.push(format!("  Difference: {}", diff));
        }
    }

    lines.join("\n")
}
