//! Individual pipeline stages.
//!
//! Each stage is a plain async function over its inputs. Persistence and
//! skip-on-resume are handled by the orchestrator.

use crate::analysis::json::{normalize_gaps, parse_or};
use crate::analysis::patterns::{aggregate, topic_samples};
use crate::analysis::recommendations::group_by_priority;
use crate::analysis::same_site;
use crate::config::CompetitorSource;
use crate::model::{
    CompetitorCandidate, CompetitorPage, DiscoveredKeywords, Gap, Patterns, Recommendations,
    SiteData,
};
use crate::prompts::{self, CommonTopics, CompetitorList, GapList};
use crate::providers::{LlmClient, PageExtractor, SearchProvider};
use anyhow::Context;
use tracing::{debug, info, warn};

/// Competitors summarized for topic extraction.
const TOPIC_SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchSite,
    DiscoverKeywords,
    DetectRanking,
    FetchCompetitors,
    AnalyzePatterns,
    IdentifyGaps,
    Recommendations,
    Score,
    AssembleReport,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::FetchSite => "fetch_site",
            Stage::DiscoverKeywords => "discover_keywords",
            Stage::DetectRanking => "detect_ranking",
            Stage::FetchCompetitors => "fetch_competitors",
            Stage::AnalyzePatterns => "analyze_patterns",
            Stage::IdentifyGaps => "identify_gaps",
            Stage::Recommendations => "recommendations",
            Stage::Score => "score",
            Stage::AssembleReport => "assemble_report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub async fn fetch_site(extractor: &dyn PageExtractor, url: &str) -> anyhow::Result<SiteData> {
    let data = extractor
        .extract(url)
        .await
        .with_context(|| format!("failed to fetch target site {url}"))?;
    info!(url, title = %data.title, word_count = data.word_count, "fetched target site");
    Ok(data)
}

pub async fn discover_keywords(
    llm: &dyn LlmClient,
    site: &SiteData,
    structured: bool,
) -> anyhow::Result<DiscoveredKeywords> {
    let response = llm
        .complete(&prompts::keyword_discovery(site, structured))
        .await
        .context("keyword discovery request failed")?;
    let keywords: DiscoveredKeywords =
        parse_or(&response.text, DiscoveredKeywords::default(), "discover_keywords");
    info!(
        primary = %keywords.primary,
        secondary = keywords.secondary.len(),
        "discovered keywords"
    );
    Ok(keywords)
}

/// Candidates for `keyword`, excluding the user's own site.
#[allow(clippy::too_many_arguments)]
pub async fn find_competitors(
    source: CompetitorSource,
    llm: &dyn LlmClient,
    search: &dyn SearchProvider,
    keyword: &str,
    site: &SiteData,
    user_url: &str,
    max: usize,
    structured: bool,
) -> anyhow::Result<Vec<CompetitorCandidate>> {
    let candidates = match source {
        CompetitorSource::Search => competitors_from_search(search, keyword, max).await?,
        CompetitorSource::Llm => {
            competitors_from_llm(llm, search, keyword, site, max, structured).await?
        }
    };
    let before = candidates.len();
    let kept: Vec<CompetitorCandidate> = candidates
        .into_iter()
        .filter(|c| !same_site(&c.url, user_url))
        .collect();
    if kept.len() < before {
        debug!(removed = before - kept.len(), "dropped candidates on the user's site");
    }
    info!(count = kept.len(), "identified competitors");
    Ok(kept)
}

async fn competitors_from_search(
    search: &dyn SearchProvider,
    keyword: &str,
    max: usize,
) -> anyhow::Result<Vec<CompetitorCandidate>> {
    let results = search
        .search(keyword, 1)
        .await
        .with_context(|| format!("competitor search for '{keyword}' failed"))?;
    Ok(results
        .into_iter()
        .take(max)
        .enumerate()
        .map(|(i, r)| CompetitorCandidate {
            rank: i as u32 + 1,
            title: r.title,
            url: r.url,
            description: r.description,
        })
        .collect())
}

/// Whether a model-suggested URL is plausible enough to fetch as is.
fn looks_like_product_url(url: &str) -> bool {
    [".com", ".io", ".ai"].iter().any(|tld| url.contains(tld))
}

async fn competitors_from_llm(
    llm: &dyn LlmClient,
    search: &dyn SearchProvider,
    keyword: &str,
    site: &SiteData,
    max: usize,
    structured: bool,
) -> anyhow::Result<Vec<CompetitorCandidate>> {
    let response = llm
        .complete(&prompts::competitor_discovery(keyword, site, structured))
        .await
        .context("competitor discovery request failed")?;
    let list: CompetitorList = parse_or(&response.text, CompetitorList::default(), "find_competitors");

    let mut out = Vec::new();
    for (i, named) in list
        .competitors
        .into_iter()
        .filter(|c| !c.url.trim().is_empty() || !c.company.trim().is_empty())
        .take(max)
        .enumerate()
    {
        let mut url = named.url.trim().to_string();
        if !url.starts_with("http") {
            url = format!("https://{url}");
        }
        let mut title = named.company.clone();
        let mut description = named.description.clone();

        if !looks_like_product_url(&url) {
            debug!(company = %named.company, "resolving official site via search");
            match search.search(&format!("{} official site", named.company), 1).await {
                Ok(results) => {
                    if let Some(first) = results.into_iter().next() {
                        url = first.url;
                        title = first.title;
                        description = first.description;
                    }
                }
                Err(e) => {
                    warn!(company = %named.company, error = %e, "could not resolve official site; keeping suggested URL");
                }
            }
        }

        out.push(CompetitorCandidate {
            rank: i as u32 + 1,
            title,
            url,
            description,
        });
    }
    Ok(out)
}

/// Fetch every candidate concurrently. Failed fetches become placeholders
/// and are then dropped with the other zero-word-count pages.
pub async fn fetch_competitors(
    extractor: &dyn PageExtractor,
    keyword: &str,
    candidates: &[CompetitorCandidate],
) -> Vec<CompetitorPage> {
    let urls: Vec<String> = candidates.iter().map(|c| c.url.clone()).collect();
    let results = extractor.extract_many(&urls).await;

    let pages: Vec<CompetitorPage> = candidates
        .iter()
        .zip(results)
        .map(|(candidate, result)| match result {
            Ok(data) => CompetitorPage {
                keyword: keyword.to_string(),
                rank: candidate.rank,
                url: candidate.url.clone(),
                data,
            },
            Err(e) => {
                warn!(url = %candidate.url, error = %e, "competitor fetch failed");
                CompetitorPage::placeholder(keyword, candidate)
            }
        })
        .filter(|p| p.data.word_count > 0)
        .collect();

    info!(
        requested = candidates.len(),
        fetched = pages.len(),
        "fetched competitor pages"
    );
    pages
}

pub async fn analyze_patterns(
    llm: &dyn LlmClient,
    competitors: &[CompetitorPage],
    structured: bool,
) -> anyhow::Result<Patterns> {
    let mut patterns = aggregate(competitors);
    if patterns.technical_patterns.total_competitors == 0 {
        warn!("no competitor pages with content; skipping topic analysis");
        return Ok(patterns);
    }

    let live: Vec<CompetitorPage> = competitors
        .iter()
        .filter(|c| c.data.word_count > 0)
        .cloned()
        .collect();
    let samples = topic_samples(&live, TOPIC_SAMPLE_SIZE);
    let response = llm
        .complete(&prompts::common_topics(&samples, structured))
        .await
        .context("topic analysis request failed")?;
    let topics: CommonTopics = parse_or(&response.text, CommonTopics::default(), "analyze_patterns");
    patterns.common_topics = topics
        .common_topics
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    info!(
        avg_word_count = patterns.avg_word_count,
        avg_h2_count = patterns.avg_h2_count,
        topics = patterns.common_topics.len(),
        "aggregated competitor patterns"
    );
    Ok(patterns)
}

pub async fn identify_gaps(
    llm: &dyn LlmClient,
    site: &SiteData,
    patterns: &Patterns,
    structured: bool,
) -> anyhow::Result<Vec<Gap>> {
    let response = llm
        .complete(&prompts::gap_identification(site, patterns, structured))
        .await
        .context("gap identification request failed")?;
    let raw: GapList = parse_or(&response.text, GapList::default(), "identify_gaps");
    let gaps = normalize_gaps(raw.gaps);
    info!(count = gaps.len(), "identified gaps");
    Ok(gaps)
}

pub async fn generate_recommendations(
    llm: &dyn LlmClient,
    site: &SiteData,
    gaps: &[Gap],
    keywords: Option<&DiscoveredKeywords>,
    target_keyword: &str,
) -> anyhow::Result<Recommendations> {
    let (high, medium, low) = group_by_priority(gaps);

    let primary = keywords
        .map(|k| k.primary.trim())
        .filter(|k| !k.is_empty())
        .unwrap_or(target_keyword);
    let response = llm
        .complete(&prompts::content_outline(site, gaps, primary))
        .await
        .context("content outline request failed")?;

    info!(
        high = high.len(),
        medium = medium.len(),
        low = low.len(),
        "generated recommendations"
    );
    Ok(Recommendations {
        high_priority: high,
        medium_priority: medium,
        low_priority: low,
        content_outline: response.text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ChatRequest, LlmResponse, ProviderError, SearchResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockLlmClient {
        responses: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockLlmClient {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().map(String::from).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: &ChatRequest) -> anyhow::Result<LlmResponse> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            let text = self
                .responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| anyhow::anyhow!("no more mock responses"))?;
            Ok(LlmResponse {
                text,
                provider: "mock".into(),
                model: "mock".into(),
                meta: serde_json::Value::Null,
            })
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }

    struct StaticSearch(Vec<SearchResult>);

    #[async_trait]
    impl SearchProvider for StaticSearch {
        async fn search(&self, _query: &str, _page: u32) -> Result<Vec<SearchResult>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    struct MapExtractor;

    #[async_trait]
    impl PageExtractor for MapExtractor {
        async fn extract(&self, url: &str) -> Result<SiteData, ProviderError> {
            if url.contains("down") {
                return Err(ProviderError::Network {
                    service: "Extractor",
                    message: "connection refused".into(),
                });
            }
            let words = if url.contains("empty") { 0 } else { 1000 };
            Ok(SiteData {
                title: url.to_string(),
                word_count: words,
                h2: vec!["Pricing".into()],
                ..Default::default()
            })
        }
    }

    fn result(url: &str) -> SearchResult {
        SearchResult {
            title: format!("title {url}"),
            url: url.into(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn search_source_excludes_user_site() {
        let search = StaticSearch(vec![
            result("https://www.acme.com/pricing"),
            result("https://rival.com/"),
            result("https://other.io/"),
        ]);
        let llm = MockLlmClient::new(vec![]);
        let out = find_competitors(
            CompetitorSource::Search,
            &llm,
            &search,
            "kanban",
            &SiteData::default(),
            "http://acme.com",
            10,
            false,
        )
        .await
        .unwrap();
        let urls: Vec<&str> = out.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://rival.com/", "https://other.io/"]);
        assert_eq!(out[0].rank, 2);
    }

    #[tokio::test]
    async fn llm_source_resolves_and_caps() {
        let llm = MockLlmClient::new(vec![
            r#"{"competitors": [
                {"company": "Rival", "url": "rival.com", "description": "boards"},
                {"company": "Odd Co", "url": "https://odd.co.uk", "description": "?"},
                {"company": "Acme", "url": "https://acme.com", "description": "self"},
                {"company": "Extra", "url": "https://extra.com", "description": "x"}
            ]}"#,
        ]);
        let search = StaticSearch(vec![result("https://www.oddco.com/")]);
        let out = find_competitors(
            CompetitorSource::Llm,
            &llm,
            &search,
            "kanban",
            &SiteData::default(),
            "https://acme.com",
            3,
            false,
        )
        .await
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].url, "https://rival.com");
        assert_eq!(out[0].title, "Rival");
        assert_eq!(out[1].url, "https://www.oddco.com/");
        assert_eq!(out[1].rank, 2);
    }

    #[tokio::test]
    async fn malformed_competitor_json_yields_none() {
        let llm = MockLlmClient::new(vec!["I cannot help with that."]);
        let out = find_competitors(
            CompetitorSource::Llm,
            &llm,
            &StaticSearch(vec![]),
            "kanban",
            &SiteData::default(),
            "https://acme.com",
            10,
            false,
        )
        .await
        .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn competitor_fetch_drops_failures_and_empty_pages() {
        let candidates: Vec<CompetitorCandidate> = ["https://a.com", "https://down.com", "https://empty.com"]
            .iter()
            .enumerate()
            .map(|(i, u)| CompetitorCandidate {
                rank: i as u32 + 1,
                title: String::new(),
                url: u.to_string(),
                description: String::new(),
            })
            .collect();
        let pages = fetch_competitors(&MapExtractor, "kanban", &candidates).await;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].url, "https://a.com");
        assert_eq!(pages[0].keyword, "kanban");
    }

    #[tokio::test]
    async fn patterns_without_competitors_skip_llm() {
        let llm = MockLlmClient::new(vec![]);
        let p = analyze_patterns(&llm, &[], false).await.unwrap();
        assert_eq!(p.avg_word_count, 0);
        assert!(p.common_topics.is_empty());
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gaps_are_parsed_and_normalized() {
        let llm = MockLlmClient::new(vec![
            r#"{"gaps": [
                {"category": "Content Depth", "severity": "Critical", "finding": "thin", "impact": "i", "recommendation": "Add 800 words"},
                {"category": "Schema", "severity": "whatever", "finding": "none", "impact": "i", "recommendation": "Add FAQ schema"},
                {"category": "Noise", "severity": "low", "finding": "x", "impact": "i", "recommendation": ""}
            ]}"#,
        ]);
        let gaps = identify_gaps(&llm, &SiteData::default(), &Patterns::default(), false)
            .await
            .unwrap();
        assert_eq!(gaps.len(), 2);
        assert_eq!(gaps[0].severity, crate::model::Severity::Critical);
        assert_eq!(gaps[1].severity, crate::model::Severity::Medium);
    }

    #[tokio::test]
    async fn recommendations_use_discovered_primary_keyword() {
        let llm = MockLlmClient::new(vec!["## Recommended H1\n**\"Kanban Boards\"**"]);
        let keywords = DiscoveredKeywords {
            primary: "kanban boards".into(),
            ..Default::default()
        };
        let recs = generate_recommendations(&llm, &SiteData::default(), &[], Some(&keywords), "kanban")
            .await
            .unwrap();
        assert!(recs.content_outline.contains("Kanban Boards"));
        assert!(llm.prompts.lock().unwrap()[0].contains("PRIMARY KEYWORD TO TARGET: kanban boards"));
    }
}
