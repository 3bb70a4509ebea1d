use crate::error::ApiError;
use crate::SUBMIT_PATH;
use anyhow::Context;
use seogap_core::config::{AppConfig, ServerConfig};
use seogap_core::payment::{HttpFacilitator, PaymentGate};
use seogap_core::providers::{ExtractorClient, OpenAiClient};
use seogap_core::{Pipeline, ReportStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Open the configured store and wire the hosted LLM and extractor clients.
pub fn build_pipeline(config: &AppConfig) -> anyhow::Result<Pipeline> {
    let store = ReportStore::open(Path::new(&config.store.path))
        .with_context(|| format!("failed to open report store {}", config.store.path))?;
    let llm = Arc::new(OpenAiClient::new(&config.llm)?);
    let web = Arc::new(ExtractorClient::new(&config.extractor)?);
    Ok(
        Pipeline::new(llm, web.clone(), web, store, config.pipeline.clone())
            .with_structured_output(config.llm.structured_output),
    )
}

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    /// `None` when payment is disabled (local / test deployments).
    pub payment: Option<PaymentGate>,
    pub settings: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, payment: Option<PaymentGate>, settings: ServerConfig) -> Self {
        Self {
            pipeline,
            payment,
            settings: Arc::new(settings),
        }
    }

    /// Wire the real store, providers and facilitator from configuration.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        config.validate_for_server()?;
        let pipeline = build_pipeline(config)?;

        let payment = if config.payment.enabled {
            let facilitator = Arc::new(HttpFacilitator::new(&config.payment)?);
            let resource = format!(
                "{}{}",
                config.server.public_url.trim_end_matches('/'),
                SUBMIT_PATH
            );
            let gate = PaymentGate::new(&config.payment, &resource, facilitator)?;
            info!(
                network = %config.payment.network,
                price = %config.payment.price,
                "payment gate enabled"
            );
            Some(gate)
        } else {
            warn!("payment gate disabled; submissions are accepted without payment");
            None
        };

        Ok(Self::new(pipeline, payment, config.server.clone()))
    }

    pub fn store(&self) -> &ReportStore {
        self.pipeline.store()
    }

    pub fn internal(&self, err: impl Into<anyhow::Error>) -> ApiError {
        ApiError::internal(err, self.settings.expose_internal_errors)
    }

    pub fn store_error(&self, err: seogap_core::storage::StoreError) -> ApiError {
        ApiError::from_store(err, self.settings.expose_internal_errors)
    }
}
