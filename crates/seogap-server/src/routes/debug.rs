//! Read-only inspection routes, mounted only when debug endpoints are on.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::response::Json;
use seogap_core::model::SiteMetrics;
use seogap_core::pipeline::progress;
use serde_json::{json, Value};

const RECENT: u32 = 10;

/// `GET /api/debug/report/:run_id`
pub async fn report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = state
        .store()
        .get(&id)
        .map_err(|e| state.store_error(e))?
        .ok_or_else(|| ApiError::NotFound("Report not found".to_string()))?;

    Ok(Json(json!({
        "runId": record.run_id,
        "status": record.status,
        "userUrl": record.user_url,
        "targetKeyword": record.target_keyword,
        "progress": progress(&record),
        "score": record.score,
        "failureReason": record.failure_reason,
        "paymentPayer": record.payment_payer,
        "paymentTxHash": record.payment_tx_hash,
        "hasReportData": record.report_data.is_some(),
        "userSiteData": record.user_site_data.as_ref().map(SiteMetrics::from),
        "discoveredKeywords": record.discovered_keywords,
        "googleRanking": record.google_ranking,
        "competitorData": record.competitor_data,
        "patterns": record.patterns,
        "gaps": record.gaps,
        "recommendations": record.recommendations,
        "reportData": record.report_data,
    })))
}

/// `GET /api/debug/reports`
pub async fn recent(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let records = state
        .store()
        .list_recent(RECENT)
        .map_err(|e| state.store_error(e))?;
    let reports: Vec<Value> = records
        .iter()
        .map(|r| {
            json!({
                "runId": r.run_id,
                "status": r.status,
                "userUrl": r.user_url,
                "createdAt": r.created_at,
                "hasReportData": r.report_data.is_some(),
            })
        })
        .collect();
    Ok(Json(json!({ "count": reports.len(), "reports": reports })))
}
