//! Report record and the payloads each pipeline stage produces.
//!
//! Field names serialize in camelCase: the same shape is persisted in the
//! store, returned by the HTTP API and rendered by the CLI.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle of a run. Only `Analyzing -> Completed | Failed` is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Analyzing,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Analyzing => "analyzing",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "analyzing" => Some(RunStatus::Analyzing),
            "completed" => Some(RunStatus::Completed),
            "failed" => Some(RunStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Analyzing)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured page metrics returned by the content-extraction service.
///
/// Also the source of the extraction schema sent to that service, so the
/// doc comments below double as extraction instructions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteData {
    /// The page title (from <title> tag or meta og:title)
    pub title: String,
    /// Meta description content
    pub meta_description: String,
    /// All H1 headings on the page
    pub h1: Vec<String>,
    /// All H2 headings on the page
    pub h2: Vec<String>,
    /// All H3 headings on the page
    pub h3: Vec<String>,
    /// Total word count of the main content
    #[serde(deserialize_with = "de_count")]
    #[schemars(with = "u64")]
    pub word_count: u64,
    /// Count of internal links on the page
    #[serde(deserialize_with = "de_count")]
    #[schemars(with = "u64")]
    pub internal_links: u64,
    /// Count of external links on the page
    #[serde(deserialize_with = "de_count")]
    #[schemars(with = "u64")]
    pub external_links: u64,
    /// Total number of images on the page
    #[serde(deserialize_with = "de_count")]
    #[schemars(with = "u64")]
    pub images: u64,
    /// Whether the page has structured data (schema.org markup)
    pub has_schema: bool,
    /// Whether the page has Open Graph meta tags
    pub has_open_graph: bool,
    /// Whether the page has a canonical link tag
    pub has_canonical: bool,
    /// Main text content of the page (cleaned, without HTML tags)
    pub content: String,
}

/// Extraction output is model-generated: counts may arrive as floats,
/// negative numbers, numeric strings or null.
pub(crate) fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| if f > 0.0 { f.round() as u64 } else { 0 }))
            .unwrap_or(0),
        serde_json::Value::String(s) => s
            .trim()
            .replace(',', "")
            .parse::<f64>()
            .map(|f| if f > 0.0 { f.round() as u64 } else { 0 })
            .unwrap_or(0),
        _ => 0,
    })
}

/// Supporting keywords discovered from the user's own page. Advisory only:
/// the run always targets the keyword the user submitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveredKeywords {
    /// Category keyword (2-5 words, no brand names)
    pub primary: String,
    /// Related category terms
    pub secondary: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Where the user's domain was found in search results, if at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingResult {
    pub rank: Option<u32>,
    pub found_url: Option<String>,
}

impl RankingResult {
    pub fn not_found() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorCandidate {
    pub rank: u32,
    pub title: String,
    pub url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorPage {
    pub keyword: String,
    pub rank: u32,
    pub url: String,
    #[serde(flatten)]
    pub data: SiteData,
}

impl CompetitorPage {
    /// Stand-in for a page the extractor could not fetch.
    pub fn placeholder(keyword: &str, candidate: &CompetitorCandidate) -> Self {
        Self {
            keyword: keyword.to_string(),
            rank: candidate.rank,
            url: candidate.url.clone(),
            data: SiteData {
                title: candidate.title.clone(),
                meta_description: candidate.description.clone(),
                ..SiteData::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalPatterns {
    pub schema_usage: u32,
    pub total_competitors: u32,
}

/// Aggregate competitor statistics (rounded means) plus LLM-named topics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patterns {
    pub avg_word_count: u64,
    pub avg_h2_count: u64,
    pub avg_h3_count: u64,
    pub avg_internal_links: u64,
    pub avg_external_links: u64,
    pub common_topics: Vec<String>,
    pub technical_patterns: TechnicalPatterns,
    /// Share of competitors carrying schema markup, 0.0..=1.0.
    pub schema_adoption: f64,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    /// Case-insensitive; the LLM is not reliable about capitalization.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" | "moderate" => Some(Severity::Medium),
            "low" | "minor" => Some(Severity::Low),
            _ => None,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            Severity::Critical | Severity::High => Priority::High,
            Severity::Medium => Priority::Medium,
            Severity::Low => Priority::Low,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recommendation bucket. `High` merges critical and high severity gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// One discrepancy between the user's page and the competitor benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    pub category: String,
    pub severity: Severity,
    pub finding: String,
    pub impact: String,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_effort: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Recommendations {
    pub high_priority: Vec<String>,
    pub medium_priority: Vec<String>,
    pub low_priority: Vec<String>,
    pub content_outline: String,
}

// ---------------------------------------------------------------------------
// Structured report (reportData)
// ---------------------------------------------------------------------------

/// The single headline metric of a report. A deployment uses one kind for
/// every report it produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Headline {
    #[serde(rename_all = "camelCase")]
    Ranking {
        google_ranking: Option<u32>,
        google_ranking_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Score { score: u8 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub overview: String,
    pub key_findings: Vec<String>,
    pub headline: Headline,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteMetrics {
    pub word_count: u64,
    pub h2_count: u64,
    pub h3_count: u64,
    pub internal_links: u64,
    pub external_links: u64,
    pub has_schema: bool,
}

impl From<&SiteData> for SiteMetrics {
    fn from(d: &SiteData) -> Self {
        Self {
            word_count: d.word_count,
            h2_count: d.h2.len() as u64,
            h3_count: d.h3.len() as u64,
            internal_links: d.internal_links,
            external_links: d.external_links,
            has_schema: d.has_schema,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorBenchmarks {
    pub avg_word_count: u64,
    pub avg_h2_count: u64,
    pub avg_h3_count: u64,
    pub avg_internal_links: u64,
    pub avg_external_links: u64,
    pub schema_usage: u32,
    pub total_competitors: u32,
}

impl From<&Patterns> for CompetitorBenchmarks {
    fn from(p: &Patterns) -> Self {
        Self {
            avg_word_count: p.avg_word_count,
            avg_h2_count: p.avg_h2_count,
            avg_h3_count: p.avg_h3_count,
            avg_internal_links: p.avg_internal_links,
            avg_external_links: p.avg_external_links,
            schema_usage: p.technical_patterns.schema_usage,
            total_competitors: p.technical_patterns.total_competitors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRecommendation {
    pub title: String,
    pub description: String,
    pub action_items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedRecommendations {
    pub high_priority: Vec<StructuredRecommendation>,
    pub medium_priority: Vec<StructuredRecommendation>,
    pub low_priority: Vec<StructuredRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineSection {
    pub title: String,
    pub estimated_word_count: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentOutline {
    pub recommended_h1: String,
    pub h2_sections: Vec<OutlineSection>,
    pub total_estimated_word_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordSummary {
    pub primary: String,
    pub secondary: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorSummary {
    pub rank: u32,
    pub url: String,
    pub title: String,
    pub word_count: u64,
    pub h2_count: u64,
}

/// Final report object rendered by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredReport {
    pub executive_summary: ExecutiveSummary,
    pub your_metrics: SiteMetrics,
    pub competitor_benchmarks: CompetitorBenchmarks,
    pub gaps: Vec<Gap>,
    pub recommendations: GroupedRecommendations,
    pub content_outline: ContentOutline,
    pub keywords: KeywordSummary,
    pub competitors: Vec<CompetitorSummary>,
}

// ---------------------------------------------------------------------------
// Report record
// ---------------------------------------------------------------------------

/// The persisted state of one run.
///
/// Every optional payload field is written by exactly one stage; its
/// presence means that stage completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRecord {
    pub run_id: String,
    pub user_id: String,
    pub user_url: String,
    pub target_keyword: String,
    pub created_at: DateTime<Utc>,
    pub status: RunStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_site_data: Option<SiteData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovered_keywords: Option<DiscoveredKeywords>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_ranking: Option<RankingResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor_data: Option<Vec<CompetitorPage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Patterns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaps: Option<Vec<Gap>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Recommendations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_data: Option<StructuredReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_tx_hash: Option<String>,
}

/// Inputs fixed at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub run_id: String,
    pub user_id: String,
    pub user_url: String,
    pub target_keyword: String,
    pub payment_payer: Option<String>,
}

impl ReportRecord {
    pub fn has(&self, field: RecordField) -> bool {
        match field {
            RecordField::UserSiteData => self.user_site_data.is_some(),
            RecordField::DiscoveredKeywords => self.discovered_keywords.is_some(),
            RecordField::GoogleRanking => self.google_ranking.is_some(),
            RecordField::CompetitorData => self.competitor_data.is_some(),
            RecordField::Patterns => self.patterns.is_some(),
            RecordField::Gaps => self.gaps.is_some(),
            RecordField::Recommendations => self.recommendations.is_some(),
            RecordField::Score => self.score.is_some(),
            RecordField::ReportData => self.report_data.is_some(),
        }
    }
}

/// Payload fields a stage may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    UserSiteData,
    DiscoveredKeywords,
    GoogleRanking,
    CompetitorData,
    Patterns,
    Gaps,
    Recommendations,
    Score,
    ReportData,
}

impl RecordField {
    pub const ALL: [RecordField; 9] = [
        RecordField::UserSiteData,
        RecordField::DiscoveredKeywords,
        RecordField::GoogleRanking,
        RecordField::CompetitorData,
        RecordField::Patterns,
        RecordField::Gaps,
        RecordField::Recommendations,
        RecordField::Score,
        RecordField::ReportData,
    ];

    /// Column name in the `reports` table.
    pub fn column(&self) -> &'static str {
        match self {
            RecordField::UserSiteData => "user_site_data",
            RecordField::DiscoveredKeywords => "discovered_keywords",
            RecordField::GoogleRanking => "google_ranking",
            RecordField::CompetitorData => "competitor_data",
            RecordField::Patterns => "patterns",
            RecordField::Gaps => "gaps",
            RecordField::Recommendations => "recommendations",
            RecordField::Score => "score",
            RecordField::ReportData => "report_data",
        }
    }

    /// Key used in JSON bodies (API, PATCH).
    pub fn json_name(&self) -> &'static str {
        match self {
            RecordField::UserSiteData => "userSiteData",
            RecordField::DiscoveredKeywords => "discoveredKeywords",
            RecordField::GoogleRanking => "googleRanking",
            RecordField::CompetitorData => "competitorData",
            RecordField::Patterns => "patterns",
            RecordField::Gaps => "gaps",
            RecordField::Recommendations => "recommendations",
            RecordField::Score => "score",
            RecordField::ReportData => "reportData",
        }
    }

    pub fn from_json_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.json_name() == name)
    }
}

/// A stage output ready to be written to its field.
#[derive(Debug, Clone, PartialEq)]
pub enum Checkpoint {
    UserSiteData(SiteData),
    DiscoveredKeywords(DiscoveredKeywords),
    GoogleRanking(RankingResult),
    CompetitorData(Vec<CompetitorPage>),
    Patterns(Patterns),
    Gaps(Vec<Gap>),
    Recommendations(Recommendations),
    Score(u8),
    ReportData(Box<StructuredReport>),
}

impl Checkpoint {
    pub fn field(&self) -> RecordField {
        match self {
            Checkpoint::UserSiteData(_) => RecordField::UserSiteData,
            Checkpoint::DiscoveredKeywords(_) => RecordField::DiscoveredKeywords,
            Checkpoint::GoogleRanking(_) => RecordField::GoogleRanking,
            Checkpoint::CompetitorData(_) => RecordField::CompetitorData,
            Checkpoint::Patterns(_) => RecordField::Patterns,
            Checkpoint::Gaps(_) => RecordField::Gaps,
            Checkpoint::Recommendations(_) => RecordField::Recommendations,
            Checkpoint::Score(_) => RecordField::Score,
            Checkpoint::ReportData(_) => RecordField::ReportData,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Checkpoint::UserSiteData(v) => serde_json::to_string(v),
            Checkpoint::DiscoveredKeywords(v) => serde_json::to_string(v),
            Checkpoint::GoogleRanking(v) => serde_json::to_string(v),
            Checkpoint::CompetitorData(v) => serde_json::to_string(v),
            Checkpoint::Patterns(v) => serde_json::to_string(v),
            Checkpoint::Gaps(v) => serde_json::to_string(v),
            Checkpoint::Recommendations(v) => serde_json::to_string(v),
            Checkpoint::Score(v) => serde_json::to_string(v),
            Checkpoint::ReportData(v) => serde_json::to_string(v),
        }
    }

    /// Decode a JSON value into the checkpoint for `field` (debug PATCH path).
    pub fn from_value(field: RecordField, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match field {
            RecordField::UserSiteData => Checkpoint::UserSiteData(serde_json::from_value(value)?),
            RecordField::DiscoveredKeywords => {
                Checkpoint::DiscoveredKeywords(serde_json::from_value(value)?)
            }
            RecordField::GoogleRanking => Checkpoint::GoogleRanking(serde_json::from_value(value)?),
            RecordField::CompetitorData => {
                Checkpoint::CompetitorData(serde_json::from_value(value)?)
            }
            RecordField::Patterns => Checkpoint::Patterns(serde_json::from_value(value)?),
            RecordField::Gaps => Checkpoint::Gaps(serde_json::from_value(value)?),
            RecordField::Recommendations => {
                Checkpoint::Recommendations(serde_json::from_value(value)?)
            }
            RecordField::Score => Checkpoint::Score(serde_json::from_value(value)?),
            RecordField::ReportData => Checkpoint::ReportData(serde_json::from_value(value)?),
        })
    }
}
