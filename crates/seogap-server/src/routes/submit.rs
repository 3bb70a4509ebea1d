use crate::error::ApiError;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderMap};
use axum::response::Json;
use seogap_core::analysis::validation::validate_request;
use seogap_core::errors::sanitize_message;
use seogap_core::model::NewReport;
use seogap_core::payment::{header, PaymentError, PaymentGate, VerifiedPayment};
use seogap_core::run_id;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SubmitRequest {
    url: Option<String>,
    user_id: Option<String>,
    target_keyword: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub run_id: String,
    pub message: String,
}

fn payment_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::PAYMENT_SIGNATURE)
        .or_else(|| headers.get(header::X_PAYMENT))
        .and_then(|v| v.to_str().ok())
}

async fn check_payment(
    state: &AppState,
    gate: &PaymentGate,
    headers: &HeaderMap,
) -> Result<VerifiedPayment, ApiError> {
    match gate.verify(payment_header(headers)).await {
        Ok(payment) => Ok(payment),
        Err(e) if e.is_payment_required() => {
            let reason = match &e {
                PaymentError::Missing => None,
                PaymentError::Facilitator(_) => Some(sanitize_message(&e.to_string()).to_string()),
                other => Some(other.to_string()),
            };
            info!(error = %e, "payment required");
            Err(ApiError::PaymentRequired(Box::new(
                gate.payment_required(reason.as_deref()),
            )))
        }
        Err(e) => Err(state.internal(e)),
    }
}

fn settle_in_background(
    gate: PaymentGate,
    payment: VerifiedPayment,
    state: AppState,
    run_id: String,
) {
    tokio::spawn(async move {
        match gate.settle(&payment).await {
            Ok(resp) => match resp.transaction.as_deref() {
                Some(tx) => {
                    info!(run_id = %run_id, tx = %tx, "payment settled");
                    if let Err(e) = state.store().record_payment_settlement(&run_id, tx) {
                        warn!(run_id = %run_id, error = %e, "could not record settlement");
                    }
                }
                None => info!(run_id = %run_id, "payment settled without transaction hash"),
            },
            Err(e) => warn!(run_id = %run_id, error = %e, "payment settlement failed"),
        }
    });
}

/// `POST /api/workflows/seo-analysis`
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SubmitResponse>, ApiError> {
    let payment = match &state.payment {
        Some(gate) => Some((gate.clone(), check_payment(&state, gate, &headers).await?)),
        None => None,
    };

    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    if !is_json {
        return Err(ApiError::UnsupportedMediaType);
    }

    let req: SubmitRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))?;
    let valid = validate_request(
        req.url.as_deref().unwrap_or_default(),
        req.user_id.as_deref().unwrap_or_default(),
        req.target_keyword.as_deref().unwrap_or_default(),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let run_id = run_id::generate();
    let payer = payment.as_ref().and_then(|(_, p)| p.payer.clone());
    state
        .store()
        .create(&NewReport {
            run_id: run_id.clone(),
            user_id: valid.user_id,
            user_url: valid.url.clone(),
            target_keyword: valid.target_keyword.clone(),
            payment_payer: payer,
        })
        .map_err(|e| state.internal(e))?;

    info!(
        run_id = %run_id,
        url = %valid.url,
        keyword = %valid.target_keyword,
        "analysis accepted"
    );
    state.pipeline.spawn(run_id.clone());

    if let Some((gate, verified)) = payment {
        settle_in_background(gate, verified, state.clone(), run_id.clone());
    }

    Ok(Json(SubmitResponse {
        success: true,
        run_id,
        message: "SEO analysis started".to_string(),
    }))
}
