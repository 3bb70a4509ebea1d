//! Client for the hosted search / content-extraction service.

use crate::config::ExtractorConfig;
use crate::model::SiteData;
use crate::providers::http::{Auth, HttpBackend, ProviderError, RetryPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// One page (1-based) of organic results for `query`.
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, ProviderError>;
}

#[async_trait]
pub trait PageExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<SiteData, ProviderError>;

    /// Extract all `urls` concurrently; results keep input order.
    async fn extract_many(&self, urls: &[String]) -> Vec<Result<SiteData, ProviderError>> {
        futures::future::join_all(urls.iter().map(|u| self.extract(u))).await
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    data: Option<T>,
}

#[derive(Deserialize)]
struct SearchData {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct FetchData {
    json: Option<serde_json::Value>,
}

const SERVICE: &str = "Extractor";

pub struct ExtractorClient {
    backend: HttpBackend,
    wait_for_ms: u64,
    schema: serde_json::Value,
}

impl ExtractorClient {
    pub fn new(config: &ExtractorConfig) -> Result<Self, ProviderError> {
        let auth = match config.api_key.as_deref() {
            Some(key) if !key.is_empty() => Auth::Header {
                name: "x-api-key",
                value: key.to_string(),
            },
            _ => Auth::None,
        };
        let backend = HttpBackend::new(
            SERVICE,
            &config.base_url,
            auth,
            Duration::from_secs(config.timeout_secs),
            RetryPolicy {
                max_retries: config.max_retries,
                ..RetryPolicy::default()
            },
        )?;
        Ok(Self {
            backend,
            wait_for_ms: config.wait_for_ms,
            schema: extraction_schema(),
        })
    }
}

/// JSON schema describing [`SiteData`], sent as the extraction target.
pub fn extraction_schema() -> serde_json::Value {
    let mut schema =
        serde_json::to_value(schemars::schema_for!(SiteData)).unwrap_or_else(|_| json!({}));
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.insert(
            "required".to_string(),
            json!(["title", "h1", "h2", "wordCount"]),
        );
    }
    schema
}

fn unwrap_envelope<T>(env: Envelope<T>, what: &str) -> Result<T, ProviderError> {
    if let Some(err) = env.error.filter(|e| !e.is_empty()) {
        return Err(ProviderError::invalid(SERVICE, format!("{what} failed: {err}")));
    }
    if matches!(env.status.as_deref(), Some("failed") | Some("error")) {
        return Err(ProviderError::invalid(SERVICE, format!("{what} failed")));
    }
    env.data
        .ok_or_else(|| ProviderError::invalid(SERVICE, format!("{what} response missing data")))
}

#[async_trait]
impl SearchProvider for ExtractorClient {
    async fn search(&self, query: &str, page: u32) -> Result<Vec<SearchResult>, ProviderError> {
        let body = json!({ "query": query, "page": page });
        let env: Envelope<SearchData> = self.backend.post_json("/web/search", &body).await?;
        let data = unwrap_envelope(env, "search")?;
        debug!(query, page, results = data.results.len(), "search page");
        Ok(data.results)
    }
}

#[async_trait]
impl PageExtractor for ExtractorClient {
    async fn extract(&self, url: &str) -> Result<SiteData, ProviderError> {
        let body = json!({
            "url": url,
            "outputs": {
                "formats": [{ "type": "json", "schema": self.schema }]
            },
            "stealth": "auto",
            "navigation": {
                "waitUntil": "networkidle",
                "waitFor": self.wait_for_ms
            }
        });
        let env: Envelope<FetchData> = self.backend.post_json("/web/fetch", &body).await?;
        let data = unwrap_envelope(env, "fetch")?;
        let value = data
            .json
            .ok_or_else(|| ProviderError::invalid(SERVICE, "fetch response missing json"))?;
        let site: SiteData = serde_json::from_value(value).map_err(|e| {
            warn!(url, error = %e, "extraction output did not match schema");
            ProviderError::invalid(SERVICE, format!("bad extraction for {url}: {e}"))
        })?;
        Ok(site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ExtractorClient {
        ExtractorClient::new(&ExtractorConfig {
            base_url: server.uri(),
            api_key: Some("ek".into()),
            max_retries: 0,
            ..ExtractorConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn schema_lists_site_fields() {
        let schema = extraction_schema();
        assert!(schema["properties"]["wordCount"].is_object());
        assert!(schema["properties"]["hasSchema"].is_object());
        assert_eq!(schema["required"], json!(["title", "h1", "h2", "wordCount"]));
    }

    #[tokio::test]
    async fn search_returns_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web/search"))
            .and(header("x-api-key", "ek"))
            .and(body_partial_json(json!({"query": "crm", "page": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "completed",
                "data": {"query": "crm", "results": [
                    {"title": "A", "url": "https://a.example", "description": "a"},
                    {"url": "https://b.example"}
                ]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = client(&server).search("crm", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].url, "https://b.example");
        assert!(results[1].title.is_empty());
    }

    #[tokio::test]
    async fn extract_sends_schema_and_decodes_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web/fetch"))
            .and(body_partial_json(json!({
                "url": "https://example.com",
                "stealth": "auto",
                "navigation": {"waitUntil": "networkidle", "waitFor": 2000}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"json": {
                    "title": "Example", "h1": ["Example"], "h2": ["One", "Two"],
                    "wordCount": 812, "hasSchema": true
                }}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let site = client(&server).extract("https://example.com").await.unwrap();
        assert_eq!(site.word_count, 812);
        assert_eq!(site.h2.len(), 2);
        assert!(site.has_schema);
    }

    #[tokio::test]
    async fn extract_many_tolerates_individual_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/web/fetch"))
            .and(body_partial_json(json!({"url": "https://bad.example"})))
            .respond_with(ResponseTemplate::new(400).set_body_string("blocked"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/web/fetch"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"json": {"title": "ok", "wordCount": 10}}
            })))
            .mount(&server)
            .await;

        let urls = vec![
            "https://good.example".to_string(),
            "https://bad.example".to_string(),
        ];
        let results = client(&server).extract_many(&urls).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().word_count, 10);
        assert!(results[1].is_err());
    }

    #[tokio::test]
    async fn error_envelope_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "failed", "error": "navigation timeout"
            })))
            .mount(&server)
            .await;

        let err = client(&server).extract("https://x.example").await.unwrap_err();
        assert!(err.to_string().contains("navigation timeout"));
    }
}
