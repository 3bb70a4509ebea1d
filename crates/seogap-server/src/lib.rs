#![forbid(unsafe_code)]
//! HTTP API for paid SEO gap analysis.
//!
//! Submissions are gated by an x402 payment, validated, stored as an
//! `analyzing` run and handed to the [`Pipeline`](seogap_core::Pipeline) on a
//! background task. Clients poll the status route until the run is terminal.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use state::{build_pipeline, AppState};

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

pub const SUBMIT_PATH: &str = "/api/workflows/seo-analysis";

pub fn router(state: AppState) -> Router {
    let body_limit = state.settings.body_limit_bytes;
    let mut app = Router::new()
        .route("/health", get(routes::health))
        .route(SUBMIT_PATH, post(routes::submit::submit))
        .route("/api/report/:run_id/status", get(routes::reports::status))
        .route(
            "/api/report/:run_id",
            get(routes::reports::get_report).patch(routes::reports::patch_report),
        )
        .route("/api/reports/user", get(routes::reports::list_user));

    if state.settings.debug_endpoints {
        app = app
            .route("/api/debug/report/:run_id", get(routes::debug::report))
            .route("/api/debug/reports", get(routes::debug::recent));
    }

    app.with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit))
}

/// Serve the API until `shutdown` resolves.
///
/// Runs left `analyzing` by a previous process are resumed first when
/// `server.resume_on_start` is set.
pub async fn serve<F>(state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if state.settings.resume_on_start {
        let resumed = state.pipeline.resume_all()?;
        if !resumed.is_empty() {
            info!(count = resumed.len(), "resumed interrupted runs");
        }
    }

    let addr: SocketAddr = state
        .settings
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", state.settings.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "seogap API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down gracefully");
    }
}
