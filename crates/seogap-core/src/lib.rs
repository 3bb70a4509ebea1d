//! Core of the SEO gap analysis service.
//!
//! A run takes a user URL and a target keyword through a fixed sequence of
//! stages (site extraction, keyword discovery, ranking detection, competitor
//! extraction, aggregation, gap analysis, recommendations, report assembly),
//! checkpointing each stage's output into a [`storage::ReportStore`] record.
//!
//! External services are reached over HTTP:
//!
//! - an OpenAI-compatible chat-completions API ([`providers::llm`])
//! - a hosted search / content-extraction API ([`providers::extractor`])
//! - an x402 payment facilitator ([`payment`])
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `SEOGAP_DB` | SQLite path for the report store (default: `seogap.db`) |
//! | `OPENAI_API_KEY` | LLM API key |
//! | `SEOGAP_EXTRACTOR_API_KEY` | Content-extraction API key |
//! | `SEOGAP_FACILITATOR_API_KEY` | Facilitator API key (optional) |
//! | `SEOGAP_HEADLINE` | `ranking` (default) or `score` |
//!
//! See [`config::AppConfig`] for the full list.

pub mod analysis;
pub mod config;
pub mod errors;
pub mod model;
pub mod payment;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod report;
pub mod run_id;
pub mod storage;

pub use config::AppConfig;
pub use model::{ReportRecord, RunStatus};
pub use pipeline::Pipeline;
pub use storage::ReportStore;
