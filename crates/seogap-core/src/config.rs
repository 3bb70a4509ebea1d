//! Application configuration.
//!
//! Loaded from an optional YAML file, then overridden by environment
//! variables. Every field has a default so an empty file (or no file) is a
//! valid configuration for local use.

use crate::analysis::ranking::MAX_PAGES;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub extractor: ExtractorConfig,
    pub payment: PaymentConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
    /// Externally visible base URL, used as the payment resource URL.
    pub public_url: String,
    /// Enables the debug inspection routes and the PATCH mutation route.
    pub debug_endpoints: bool,
    /// Return raw error text in 500 bodies instead of sanitized messages.
    pub expose_internal_errors: bool,
    /// Resume runs still `analyzing` when the server starts.
    pub resume_on_start: bool,
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            public_url: "http://localhost:3000".to_string(),
            debug_endpoints: false,
            expose_internal_errors: false,
            resume_on_start: true,
            body_limit_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "seogap.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Request JSON-schema constrained output instead of plain JSON mode.
    pub structured_output: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 60,
            max_retries: 2,
            structured_output: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Milliseconds to wait after network idle before extracting.
    pub wait_for_ms: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.hyperbrowser.ai/x402".to_string(),
            api_key: None,
            timeout_secs: 120,
            max_retries: 2,
            wait_for_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PaymentConfig {
    pub enabled: bool,
    /// Price in USD, e.g. `$0.50`.
    pub price: String,
    /// `base` or `base-sepolia`.
    pub network: String,
    pub pay_to: Option<String>,
    pub facilitator_url: String,
    #[serde(skip_serializing)]
    pub facilitator_api_key: Option<String>,
    pub description: String,
    pub timeout_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            price: "$0.50".to_string(),
            network: "base-sepolia".to_string(),
            pay_to: None,
            facilitator_url: "https://x402.org/facilitator".to_string(),
            facilitator_api_key: None,
            description: "SEO gap analysis report".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadlineKind {
    #[default]
    Ranking,
    Score,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitorSource {
    /// Ask the LLM to name competitor companies, then resolve their sites.
    #[default]
    Llm,
    /// Use the top organic search results for the keyword.
    Search,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub headline: HeadlineKind,
    pub competitor_source: CompetitorSource,
    pub max_competitors: usize,
    /// Search result pages scanned for ranking detection (10 results each, at most 10).
    pub ranking_pages: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            headline: HeadlineKind::Ranking,
            competitor_source: CompetitorSource::Llm,
            max_competitors: 10,
            ranking_pages: 10,
        }
    }
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

impl AppConfig {
    /// Load from `path` (if given) and apply environment overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read config {}", p.display()))?;
                Self::from_yaml(&raw)
                    .with_context(|| format!("failed to parse config {}", p.display()))?
            }
            None => Self::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut cfg: Self = serde_yaml::from_str(raw)?;
        cfg.pipeline.ranking_pages = cfg.pipeline.ranking_pages.clamp(1, MAX_PAGES);
        Ok(cfg)
    }

    /// Environment overrides.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `SEOGAP_BIND` | `server.bind` |
    /// | `SEOGAP_PUBLIC_URL` | `server.public_url` |
    /// | `SEOGAP_DEBUG_ENDPOINTS` | `server.debug_endpoints` |
    /// | `SEOGAP_EXPOSE_INTERNAL_ERRORS` | `server.expose_internal_errors` |
    /// | `SEOGAP_RESUME_ON_START` | `server.resume_on_start` |
    /// | `SEOGAP_DB` | `store.path` |
    /// | `SEOGAP_LLM_BASE_URL` | `llm.base_url` |
    /// | `SEOGAP_LLM_MODEL` | `llm.model` |
    /// | `OPENAI_API_KEY` | `llm.api_key` |
    /// | `SEOGAP_LLM_STRUCTURED_OUTPUT` | `llm.structured_output` |
    /// | `SEOGAP_EXTRACTOR_URL` | `extractor.base_url` |
    /// | `SEOGAP_EXTRACTOR_API_KEY` | `extractor.api_key` |
    /// | `SEOGAP_PAYMENT_ENABLED` | `payment.enabled` |
    /// | `SEOGAP_PRICE` | `payment.price` |
    /// | `SEOGAP_NETWORK` | `payment.network` |
    /// | `SEOGAP_PAY_TO` | `payment.pay_to` |
    /// | `SEOGAP_FACILITATOR_URL` | `payment.facilitator_url` |
    /// | `SEOGAP_FACILITATOR_API_KEY` | `payment.facilitator_api_key` |
    /// | `SEOGAP_HEADLINE` | `pipeline.headline` (`ranking` / `score`) |
    /// | `SEOGAP_COMPETITOR_SOURCE` | `pipeline.competitor_source` (`llm` / `search`) |
    pub fn apply_env(&mut self) {
        if let Some(v) = env_string("SEOGAP_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = env_string("SEOGAP_PUBLIC_URL") {
            self.server.public_url = v;
        }
        if let Some(v) = env_bool("SEOGAP_DEBUG_ENDPOINTS") {
            self.server.debug_endpoints = v;
        }
        if let Some(v) = env_bool("SEOGAP_EXPOSE_INTERNAL_ERRORS") {
            self.server.expose_internal_errors = v;
        }
        if let Some(v) = env_bool("SEOGAP_RESUME_ON_START") {
            self.server.resume_on_start = v;
        }
        if let Some(v) = env_string("SEOGAP_DB") {
            self.store.path = v;
        }

        if let Some(v) = env_string("SEOGAP_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = env_string("SEOGAP_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = env_string("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = env_bool("SEOGAP_LLM_STRUCTURED_OUTPUT") {
            self.llm.structured_output = v;
        }

        if let Some(v) = env_string("SEOGAP_EXTRACTOR_URL") {
            self.extractor.base_url = v;
        }
        if let Some(v) = env_string("SEOGAP_EXTRACTOR_API_KEY") {
            self.extractor.api_key = Some(v);
        }

        if let Some(v) = env_bool("SEOGAP_PAYMENT_ENABLED") {
            self.payment.enabled = v;
        }
        if let Some(v) = env_string("SEOGAP_PRICE") {
            self.payment.price = v;
        }
        if let Some(v) = env_string("SEOGAP_NETWORK") {
            self.payment.network = v;
        }
        if let Some(v) = env_string("SEOGAP_PAY_TO") {
            self.payment.pay_to = Some(v);
        }
        if let Some(v) = env_string("SEOGAP_FACILITATOR_URL") {
            self.payment.facilitator_url = v;
        }
        if let Some(v) = env_string("SEOGAP_FACILITATOR_API_KEY") {
            self.payment.facilitator_api_key = Some(v);
        }

        match env_string("SEOGAP_HEADLINE").as_deref() {
            Some("score") => self.pipeline.headline = HeadlineKind::Score,
            Some("ranking") => self.pipeline.headline = HeadlineKind::Ranking,
            _ => {}
        }
        match env_string("SEOGAP_COMPETITOR_SOURCE").as_deref() {
            Some("search") => self.pipeline.competitor_source = CompetitorSource::Search,
            Some("llm") => self.pipeline.competitor_source = CompetitorSource::Llm,
            _ => {}
        }
        if let Some(v) = env_parse("SEOGAP_MAX_COMPETITORS") {
            self.pipeline.max_competitors = v;
        }
    }

    /// Checks needed before serving paid requests.
    pub fn validate_for_server(&self) -> anyhow::Result<()> {
        if self.payment.enabled {
            let pay_to = self.payment.pay_to.as_deref().unwrap_or_default();
            if pay_to.is_empty() {
                anyhow::bail!("payment.pay_to (SEOGAP_PAY_TO) is required when payment is enabled");
            }
            crate::payment::Network::parse(&self.payment.network)?;
            crate::payment::parse_price_units(&self.payment.price)?;
        }
        Ok(())
    }
}
