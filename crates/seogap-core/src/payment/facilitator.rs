//! Hosted facilitator: verifies and settles payments on-chain for us.

use super::header::PaymentPayload;
use super::requirements::PaymentRequirements;
use crate::config::PaymentConfig;
use crate::providers::http::{Auth, HttpBackend, ProviderError, RetryPolicy};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FacilitatorRequest<'a> {
    x402_version: u32,
    payment_payload: &'a PaymentPayload,
    payment_requirements: &'a PaymentRequirements,
}

#[async_trait]
pub trait Facilitator: Send + Sync {
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, ProviderError>;

    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, ProviderError>;
}

pub struct HttpFacilitator {
    backend: HttpBackend,
}

impl HttpFacilitator {
    pub fn new(config: &PaymentConfig) -> Result<Self, ProviderError> {
        let auth = match config.facilitator_api_key.as_deref() {
            Some(k) if !k.is_empty() => Auth::Bearer(k.to_string()),
            _ => Auth::None,
        };
        // settle is not idempotent: never retry
        let backend = HttpBackend::new(
            "Payment facilitator",
            &config.facilitator_url,
            auth,
            Duration::from_secs(config.timeout_secs),
            RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            },
        )?;
        Ok(Self { backend })
    }
}

#[async_trait]
impl Facilitator for HttpFacilitator {
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, ProviderError> {
        let body = FacilitatorRequest {
            x402_version: payload.x402_version,
            payment_payload: payload,
            payment_requirements: requirements,
        };
        self.backend.post_json("/verify", &body).await
    }

    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, ProviderError> {
        let body = FacilitatorRequest {
            x402_version: payload.x402_version,
            payment_payload: payload,
            payment_requirements: requirements,
        };
        self.backend.post_json("/settle", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::requirements::Network;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload() -> PaymentPayload {
        serde_json::from_value(json!({
            "x402Version": 2,
            "payload": {"signature": "0xsig", "authorization": {"from": "0xpayer"}}
        }))
        .unwrap()
    }

    fn facilitator(server: &MockServer) -> HttpFacilitator {
        HttpFacilitator::new(&PaymentConfig {
            facilitator_url: server.uri(),
            ..PaymentConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn verify_posts_payload_and_requirements() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .and(body_partial_json(json!({
                "x402Version": 2,
                "paymentPayload": {"payload": {"signature": "0xsig"}},
                "paymentRequirements": {"amount": "500000", "network": "eip155:84532"}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"isValid": true, "payer": "0xpayer"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let req = PaymentRequirements::exact_usdc(Network::BaseSepolia, "$0.50", "0xpay").unwrap();
        let resp = facilitator(&server).verify(&payload(), &req).await.unwrap();
        assert!(resp.is_valid);
        assert_eq!(resp.payer.as_deref(), Some("0xpayer"));
    }

    #[tokio::test]
    async fn settle_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let req = PaymentRequirements::exact_usdc(Network::Base, "$1", "0xpay").unwrap();
        assert!(facilitator(&server).settle(&payload(), &req).await.is_err());
    }
}
