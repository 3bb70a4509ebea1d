//! Prompt builders for every LLM task, and the JSON shapes they ask for.

use crate::analysis::json::RawGap;
use crate::analysis::patterns::TopicSample;
use crate::model::{DiscoveredKeywords, Gap, Patterns, RankingResult, Severity, SiteData};
use crate::providers::ChatRequest;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const KEYWORDS_SYSTEM: &str = "You are an SEO expert. Respond with valid JSON only.";
pub const COMPETITORS_SYSTEM: &str = "You are a competitive analysis expert. Identify actual competitor companies, not review sites or blogs. Respond with valid JSON only.";
pub const TOPICS_SYSTEM: &str = "You are an SEO analyst. Respond with valid JSON only.";
pub const GAPS_SYSTEM: &str = "You are an SEO expert. Respond with valid JSON only.";
pub const OUTLINE_SYSTEM: &str = "You are an SEO content strategist.";
pub const OVERVIEW_SYSTEM: &str = "You are an SEO consultant. Write concise, professional summaries.";

const JSON_TEMPERATURE: f32 = 0.3;
const PROSE_TEMPERATURE: f32 = 0.5;
const OVERVIEW_MAX_TOKENS: u32 = 150;

/// A competitor company as named by the LLM.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct NamedCompetitor {
    /// Company name
    pub company: String,
    /// Main product URL
    pub url: String,
    /// One-sentence description of the product or service
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CompetitorList {
    pub competitors: Vec<NamedCompetitor>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CommonTopics {
    /// 5-10 content themes shared by most pages
    pub common_topics: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GapList {
    pub gaps: Vec<RawGap>,
}

/// Char-boundary safe prefix.
fn preview(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

fn joined(items: &[String], n: usize) -> String {
    items.iter().take(n).cloned().collect::<Vec<_>>().join(", ")
}

pub fn keyword_discovery(site: &SiteData, structured: bool) -> ChatRequest {
    let prompt = format!(
        r#"Analyze this website and identify CATEGORY keywords for SEO competitor analysis.

IMPORTANT: Do NOT use brand names in keywords. Focus on what the product/service IS, not what it's CALLED.

Title: {title}
Meta Description: {meta}
H1 Tags: {h1}
H2 Tags: {h2}
Main Content Preview: {content}

Steps to follow:
1. Identify the brand name from the title/content (if this is a brand's website)
2. Determine what CATEGORY or PRODUCT TYPE this site represents
3. Create generic category keywords that competitors would also rank for

Examples:
- If site is "Nike.com" selling shoes -> Primary: "athletic footwear" NOT "Nike shoes"
- If site is "Canva.com" for design -> Primary: "graphic design software" NOT "Canva design tools"
- If site is "Stripe.com" for payments -> Primary: "payment processing platform" NOT "Stripe payment"

Return GENERIC category keywords (no brand names) as JSON:
{{
  "primary": "category keyword (2-5 words, no brand names)",
  "secondary": ["related category term 1", "related category term 2", "related category term 3"],
  "intent": "commercial",
  "reasoning": "Brief explanation focusing on the product category"
}}"#,
        title = site.title,
        meta = site.meta_description,
        h1 = site.h1.join(", "),
        h2 = joined(&site.h2, 10),
        content = preview(&site.content, 2000),
    );
    ChatRequest::new(prompt)
        .system(KEYWORDS_SYSTEM)
        .temperature(JSON_TEMPERATURE)
        .json::<DiscoveredKeywords>("discovered_keywords", structured)
}

pub fn competitor_discovery(keyword: &str, site: &SiteData, structured: bool) -> ChatRequest {
    let prompt = format!(
        r#"You are analyzing a website in the "{keyword}" category.

Website Title: {title}
Website Content Preview: {content}

Identify 8-10 DIRECT COMPETITOR COMPANIES (not blog posts or review sites) that offer similar products/services in this category.

Requirements:
- Must be actual product/service providers, NOT review sites, blogs, or comparison sites
- Must be direct competitors offering similar solutions
- Include well-known established players AND emerging competitors
- Return their most likely main product page URL (usually their homepage or main product page)

For each competitor, provide:
- company: Company name
- url: Their main product URL (use .com domain, or specific product page if known)
- description: Brief 1-sentence description of what they offer

Return as JSON:
{{
  "competitors": [
    {{"company": "Company Name", "url": "https://company.com", "description": "Brief description"}}
  ]
}}"#,
        title = site.title,
        content = preview(&site.content, 500),
    );
    ChatRequest::new(prompt)
        .system(COMPETITORS_SYSTEM)
        .temperature(JSON_TEMPERATURE)
        .json::<CompetitorList>("competitors", structured)
}

pub fn common_topics(samples: &[TopicSample], structured: bool) -> ChatRequest {
    let summary = serde_json::to_string_pretty(samples).unwrap_or_else(|_| "[]".to_string());
    let prompt = format!(
        r#"Analyze these top ranking pages and identify common content themes/topics that appear across multiple pages:

{summary}

Return 5-10 common topics that appear in most pages as JSON:
{{
  "commonTopics": ["topic 1", "topic 2"]
}}"#
    );
    ChatRequest::new(prompt)
        .system(TOPICS_SYSTEM)
        .temperature(JSON_TEMPERATURE)
        .json::<CommonTopics>("common_topics", structured)
}

pub fn gap_identification(site: &SiteData, patterns: &Patterns, structured: bool) -> ChatRequest {
    let missing_words = patterns.avg_word_count.saturating_sub(site.word_count);
    let prompt = format!(
        r#"You are an SEO consultant. Analyze this website against competitor benchmarks and identify ALL significant SEO gaps.

USER SITE:
- Title: {title}
- Meta Description: {meta}
- Word Count: {words}
- H1: {h1}
- H2 Count: {h2_count} ({h2})
- H3 Count: {h3_count}
- Internal Links: {links}
- Has Schema Markup: {schema}

COMPETITOR BENCHMARKS:
- Avg Word Count: {avg_words}
- Avg H2 Count: {avg_h2}
- Avg H3 Count: {avg_h3}
- Avg Internal Links: {avg_links}
- Common Topics: {topics}
- Schema Usage: {schema_usage}/{total} have schema

Identify ALL significant SEO gaps (typically 4-10). For each gap:
- category: e.g., "Content Depth", "Content Structure", "Technical SEO", "Topic Coverage", "On-Page Optimization"
- severity: "critical" (major ranking factor), "high" (significant impact), "medium" (moderate impact), or "low" (minor improvement)
- finding: Specific, data-driven description with metrics
- impact: Quantify the ranking/traffic impact
- recommendation: Specific, actionable fix with target metrics
- estimatedEffort: "Quick win (<1 week)", "Medium (1-4 weeks)", or "Long-term (1+ months)"

Return as JSON:
{{
  "gaps": [
    {{
      "category": "Content Depth",
      "severity": "high",
      "finding": "Your page has {words} words vs {avg_words} average",
      "impact": "Thin content signals lower authority to search engines",
      "recommendation": "Add {missing_words} more words covering: {top_topics}",
      "estimatedEffort": "Medium (1-4 weeks)"
    }}
  ]
}}"#,
        title = site.title,
        meta = site.meta_description,
        words = site.word_count,
        h1 = site.h1.join(", "),
        h2_count = site.h2.len(),
        h2 = joined(&site.h2, 5),
        h3_count = site.h3.len(),
        links = site.internal_links,
        schema = site.has_schema,
        avg_words = patterns.avg_word_count,
        avg_h2 = patterns.avg_h2_count,
        avg_h3 = patterns.avg_h3_count,
        avg_links = patterns.avg_internal_links,
        topics = patterns.common_topics.join(", "),
        schema_usage = patterns.technical_patterns.schema_usage,
        total = patterns.technical_patterns.total_competitors,
        top_topics = joined(&patterns.common_topics, 3),
    );
    ChatRequest::new(prompt)
        .system(GAPS_SYSTEM)
        .temperature(JSON_TEMPERATURE)
        .json::<GapList>("gaps", structured)
}

pub fn content_outline(site: &SiteData, gaps: &[Gap], primary_keyword: &str) -> ChatRequest {
    let current_h1 = if site.h1.is_empty() {
        "None".to_string()
    } else {
        site.h1.join(", ")
    };
    let current_h2 = if site.h2.is_empty() {
        "None".to_string()
    } else {
        site.h2.join("\n")
    };
    let findings = gaps
        .iter()
        .map(|g| format!("- {}", g.finding))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = format!(
        r####"Based on these SEO gaps, create a detailed content outline for improving the page:

PRIMARY KEYWORD TO TARGET: {primary_keyword}
CURRENT PAGE H1: {current_h1}
CURRENT H2 SECTIONS:
{current_h2}

GAPS TO ADDRESS:
{findings}

Create a comprehensive content outline with:
- Recommended H1: Create a NEW H1 that's DIFFERENT from the current H1 ("{current_h1}"). Use the primary keyword "{primary_keyword}" naturally.
- 8-12 H2 sections (numbered format: "### 1. Section Title")
- For each section, include: title, estimated word count in parentheses like "(Estimated Word Count: 200)", and a brief description
- Use the actual keyword "{primary_keyword}" throughout, NOT placeholders like [Topic]

Format as markdown with this exact structure:
## Recommended H1
**"Your NEW H1 here using the keyword"**

## H2 Sections
### 1. Section Title (Estimated Word Count: 200)
Brief description of what to cover in this section.

### 2. Next Section Title (Estimated Word Count: 250)
Brief description...

Include a "Total Estimated Word Count" at the end."####
    );
    ChatRequest::new(prompt)
        .system(OUTLINE_SYSTEM)
        .temperature(PROSE_TEMPERATURE)
}

/// Headline facts the executive summary is allowed to mention.
#[derive(Debug, Clone, PartialEq)]
pub enum OverviewHeadline<'a> {
    Ranking(&'a RankingResult),
    Score(u8),
}

pub fn executive_overview(
    site: &SiteData,
    user_url: &str,
    target_keyword: &str,
    patterns: &Patterns,
    gaps: &[Gap],
    headline: OverviewHeadline<'_>,
) -> ChatRequest {
    let high = gaps
        .iter()
        .filter(|g| matches!(g.severity, Severity::Critical | Severity::High))
        .count();
    let medium = gaps.iter().filter(|g| g.severity == Severity::Medium).count();
    let mut categories: Vec<&str> = Vec::new();
    for g in gaps
        .iter()
        .filter(|g| matches!(g.severity, Severity::Critical | Severity::High))
    {
        if !categories.contains(&g.category.as_str()) && categories.len() < 3 {
            categories.push(&g.category);
        }
    }

    let (headline_line, headline_instruction) = match headline {
        OverviewHeadline::Ranking(r) => (
            match r.rank {
                Some(rank) => format!("Current Google Ranking: Position #{rank}"),
                None => "Current Google Ranking: Not found in top 100 results".to_string(),
            },
            "1. States the current Google ranking position prominently (or \"not ranking in top 100\")\n\nDO NOT mention any 0-100 score. Focus on the actual Google ranking position.",
        ),
        OverviewHeadline::Score(score) => (
            format!("SEO Score: {score}/100"),
            "1. States the SEO score out of 100 prominently\n\nDO NOT speculate about search ranking positions.",
        ),
    };

    let website = if site.title.trim().is_empty() {
        user_url
    } else {
        site.title.as_str()
    };
    let prompt = format!(
        r#"Create a concise, professional executive summary (2-3 sentences) for this SEO competitive analysis report:

Website: {website}
URL: {user_url}
Target Keyword: "{target_keyword}" (user wants to rank for this)
{headline_line}

Key Issues: {high} critical/high-priority gaps, {medium} medium-priority gaps
Main Gap Categories: {categories}

Your Site Metrics vs Competitors:
- {words} words (vs {avg_words} competitor avg)
- {h2} H2s (vs {avg_h2} competitor avg)

Write a summary that:
{headline_instruction}
2. Mentions they're targeting "{target_keyword}"
3. Highlights the most critical gap that needs immediate attention
4. Sets a positive, actionable tone about improvement potential

Return only the summary text (2-3 sentences), no markdown, no quotes."#,
        categories = categories.join(", "),
        words = site.word_count,
        avg_words = patterns.avg_word_count,
        h2 = site.h2.len(),
        avg_h2 = patterns.avg_h2_count,
    );
    ChatRequest::new(prompt)
        .system(OVERVIEW_SYSTEM)
        .temperature(PROSE_TEMPERATURE)
        .max_tokens(OVERVIEW_MAX_TOKENS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::ResponseFormat;

    fn site() -> SiteData {
        SiteData {
            title: "Acme Boards".into(),
            h1: vec!["Acme".into()],
            h2: (0..12).map(|i| format!("Section {i}")).collect(),
            word_count: 400,
            content: "é".repeat(3000),
            ..Default::default()
        }
    }

    #[test]
    fn keyword_prompt_truncates_content_on_char_boundary() {
        let req = keyword_discovery(&site(), false);
        assert_eq!(req.system.as_deref(), Some(KEYWORDS_SYSTEM));
        assert_eq!(req.format, ResponseFormat::JsonObject);
        assert!(req.prompt.contains("Section 9"));
        assert!(!req.prompt.contains("Section 10"));
        assert!(req.prompt.contains(&"é".repeat(2000)));
        assert!(!req.prompt.contains(&"é".repeat(2001)));
    }

    #[test]
    fn gap_prompt_carries_benchmarks() {
        let patterns = Patterns {
            avg_word_count: 1500,
            common_topics: vec!["pricing".into(), "integrations".into()],
            ..Default::default()
        };
        let req = gap_identification(&site(), &patterns, true);
        assert!(req.prompt.contains("Avg Word Count: 1500"));
        assert!(req.prompt.contains("Add 1100 more words covering: pricing, integrations"));
        assert!(matches!(req.format, ResponseFormat::JsonSchema { name: "gaps", .. }));
    }

    #[test]
    fn outline_is_plain_text_at_higher_temperature() {
        let req = content_outline(&SiteData::default(), &[], "kanban software");
        assert_eq!(req.format, ResponseFormat::Text);
        assert_eq!(req.temperature, 0.5);
        assert!(req.prompt.contains("CURRENT PAGE H1: None"));
        assert!(req.prompt.contains("\"kanban software\""));
    }

    #[test]
    fn overview_mentions_only_the_configured_headline() {
        let ranking = RankingResult {
            rank: Some(7),
            found_url: Some("https://acme.com/".into()),
        };
        let req = executive_overview(
            &site(),
            "https://acme.com",
            "kanban",
            &Patterns::default(),
            &[],
            OverviewHeadline::Ranking(&ranking),
        );
        assert_eq!(req.max_tokens, Some(150));
        assert!(req.prompt.contains("Position #7"));
        assert!(!req.prompt.contains("SEO Score:"));

        let req = executive_overview(
            &SiteData::default(),
            "https://acme.com",
            "kanban",
            &Patterns::default(),
            &[],
            OverviewHeadline::Score(64),
        );
        assert!(req.prompt.contains("SEO Score: 64/100"));
        assert!(req.prompt.contains("Website: https://acme.com"));
        assert!(!req.prompt.contains("Google Ranking"));
    }
}
