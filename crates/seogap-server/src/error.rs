use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use seogap_core::errors::sanitize;
use seogap_core::payment::{header, PaymentRequired};
use seogap_core::storage::StoreError;
use serde_json::json;

/// Errors returned by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,

    #[error("payment required")]
    PaymentRequired(Box<PaymentRequired>),

    /// `public` is what the client sees; `detail` is only logged.
    #[error("{public}")]
    Internal { public: String, detail: String },
}

impl ApiError {
    /// Wrap an unexpected failure. The full chain is logged; clients get a
    /// sanitized message unless `expose` is set.
    pub fn internal(err: impl Into<anyhow::Error>, expose: bool) -> Self {
        let err = err.into();
        let detail = format!("{err:#}");
        tracing::error!(error = %detail, "request failed");
        let public = if expose {
            detail.clone()
        } else {
            sanitize(&err).to_string()
        };
        ApiError::Internal { public, detail }
    }

    pub fn from_store(err: StoreError, expose: bool) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound("Report not found".to_string()),
            StoreError::StillAnalyzing { .. } | StoreError::NotAnalyzing { .. } => {
                ApiError::Conflict(err.to_string())
            }
            StoreError::UnknownField(_) | StoreError::InvalidValue { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::internal(other, expose),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::PaymentRequired(body) => {
                let mut resp = (status, Json(&*body)).into_response();
                match header::encode(&*body).map(|h| HeaderValue::from_str(&h)) {
                    Ok(Ok(value)) => {
                        resp.headers_mut().insert(header::PAYMENT_REQUIRED, value);
                    }
                    _ => tracing::warn!("could not encode PAYMENT-REQUIRED header"),
                }
                resp
            }
            other => {
                let body = json!({ "success": false, "error": other.to_string() });
                (status, Json(body)).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn internal_errors_are_sanitized_unless_exposed() {
        let (status, body) = body_json(ApiError::internal(
            anyhow::anyhow!("sqlite: disk I/O error at /var/lib/seogap.db"),
            false,
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Database error occurred. Please try again.");

        let (_, body) =
            body_json(ApiError::internal(anyhow::anyhow!("sqlite: disk I/O error"), true)).await;
        assert_eq!(body["error"], "sqlite: disk I/O error");
    }

    #[tokio::test]
    async fn store_errors_map_to_client_statuses() {
        let err = ApiError::from_store(
            StoreError::StillAnalyzing {
                run_id: "seo_1_abcdefghi".into(),
            },
            false,
        );
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = ApiError::from_store(StoreError::UnknownField("userId".into()), false);
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Unknown report field: userId");

        let err = ApiError::from_store(
            StoreError::NotFound {
                run_id: "seo_1_abcdefghi".into(),
            },
            false,
        );
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
