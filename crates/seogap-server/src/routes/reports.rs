use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use seogap_core::pipeline::{progress, RunProgress};
use seogap_core::storage::ReportSummary;
use seogap_core::{run_id, ReportRecord};
use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

fn load(state: &AppState, id: &str) -> Result<ReportRecord, ApiError> {
    if !run_id::is_valid(id) {
        return Err(ApiError::BadRequest("Invalid run ID".to_string()));
    }
    state
        .store()
        .get(id)
        .map_err(|e| state.store_error(e))?
        .ok_or_else(|| ApiError::NotFound("Report not found".to_string()))
}

/// `GET /api/report/:run_id/status`
pub async fn status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RunProgress>, ApiError> {
    let record = load(&state, &id)?;
    Ok(Json(progress(&record)))
}

/// `GET /api/report/:run_id`
pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReportRecord>, ApiError> {
    load(&state, &id).map(Json)
}

/// `PATCH /api/report/:run_id`
///
/// Debug-only merge of payload fields into a finished run.
pub async fn patch_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<serde_json::Map<String, serde_json::Value>>,
) -> Result<Json<ReportRecord>, ApiError> {
    if !state.settings.debug_endpoints {
        return Err(ApiError::Conflict(
            "Report updates are disabled".to_string(),
        ));
    }
    if !run_id::is_valid(&id) {
        return Err(ApiError::BadRequest("Invalid run ID".to_string()));
    }
    let record = state
        .store()
        .merge_patch(&id, &patch)
        .map_err(|e| state.store_error(e))?;
    tracing::info!(run_id = %id, fields = patch.len(), "report patched");
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    user_id: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReports {
    pub success: bool,
    pub reports: Vec<ReportSummary>,
    pub total: u64,
    pub has_more: bool,
}

/// `GET /api/reports/user?userId&limit&offset`
pub async fn list_user(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<UserReports>, ApiError> {
    let user_id = params
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::BadRequest("User ID is required".to_string()))?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as u32;
    let offset = params.offset.unwrap_or(0).clamp(0, u32::MAX as i64) as u32;

    let page = state
        .store()
        .list_by_user(user_id, limit, offset)
        .map_err(|e| state.store_error(e))?;
    let has_more = u64::from(offset) + (page.reports.len() as u64) < page.total;
    Ok(Json(UserReports {
        success: true,
        reports: page.reports,
        total: page.total,
        has_more,
    }))
}
