//! x402 payment gate for the submission endpoint.
//!
//! A request is accepted only after the facilitator verifies its payment
//! header against our requirements. Settlement happens later, once the
//! submission itself has been validated and the run created.

pub mod facilitator;
pub mod header;
pub mod requirements;

use crate::config::PaymentConfig;
use crate::providers::http::ProviderError;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub use facilitator::{Facilitator, HttpFacilitator, SettleResponse, VerifyResponse};
pub use header::PaymentPayload;
pub use requirements::{
    parse_price_units, Network, PaymentRequired, PaymentRequirements, ResourceInfo,
};

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment required")]
    Missing,

    #[error("invalid payment header: {0}")]
    InvalidHeader(String),

    #[error("payment rejected: {reason}")]
    Rejected { reason: String },

    #[error("payment settlement failed: {reason}")]
    SettlementFailed { reason: String },

    #[error("payment facilitator error: {0}")]
    Facilitator(#[from] ProviderError),

    #[error("payment configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Whether the client should be answered with 402 and the requirements.
    pub fn is_payment_required(&self) -> bool {
        !matches!(self, PaymentError::Config(_))
    }
}

/// A payment the facilitator accepted, not yet settled.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    pub payload: PaymentPayload,
    pub payer: Option<String>,
}

/// Requirements plus the facilitator used to check them.
#[derive(Clone)]
pub struct PaymentGate {
    requirements: PaymentRequirements,
    resource: ResourceInfo,
    facilitator: Arc<dyn Facilitator>,
}

impl PaymentGate {
    pub fn new(
        config: &PaymentConfig,
        resource_url: &str,
        facilitator: Arc<dyn Facilitator>,
    ) -> Result<Self, PaymentError> {
        let network = Network::parse(&config.network)?;
        let pay_to = config
            .pay_to
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| PaymentError::Config("pay_to address not configured".to_string()))?;
        Ok(Self {
            requirements: PaymentRequirements::exact_usdc(network, &config.price, pay_to)?,
            resource: ResourceInfo {
                url: resource_url.to_string(),
                description: config.description.clone(),
                mime_type: "application/json".to_string(),
            },
            facilitator,
        })
    }

    pub fn requirements(&self) -> &PaymentRequirements {
        &self.requirements
    }

    /// 402 body for a request that failed the gate.
    pub fn payment_required(&self, error: Option<&str>) -> PaymentRequired {
        let body = PaymentRequired::new(self.resource.clone(), vec![self.requirements.clone()]);
        match error {
            Some(e) => body.with_error(e),
            None => body,
        }
    }

    /// Decode and verify the client's payment header.
    pub async fn verify(&self, header: Option<&str>) -> Result<VerifiedPayment, PaymentError> {
        let raw = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(PaymentError::Missing)?;
        let payload: PaymentPayload = header::decode(raw)?;

        let resp = self.facilitator.verify(&payload, &self.requirements).await?;
        if !resp.is_valid {
            let reason = resp
                .invalid_reason
                .unwrap_or_else(|| "payment verification failed".to_string());
            warn!(reason = %reason, "payment rejected by facilitator");
            return Err(PaymentError::Rejected { reason });
        }

        let payer = resp
            .payer
            .or_else(|| payload.claimed_payer().map(str::to_string));
        info!(payer = payer.as_deref().unwrap_or("unknown"), "payment verified");
        Ok(VerifiedPayment { payload, payer })
    }

    pub async fn settle(&self, payment: &VerifiedPayment) -> Result<SettleResponse, PaymentError> {
        let resp = self
            .facilitator
            .settle(&payment.payload, &self.requirements)
            .await?;
        if !resp.success {
            return Err(PaymentError::SettlementFailed {
                reason: resp
                    .error_reason
                    .unwrap_or_else(|| "unknown settlement error".to_string()),
            });
        }
        Ok(resp)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::Engine;
    use std::sync::Mutex;

    /// Facilitator double with canned answers.
    pub(crate) struct StaticFacilitator {
        pub verify: VerifyResponse,
        pub settle: SettleResponse,
        pub settled: Mutex<u32>,
    }

    impl StaticFacilitator {
        pub(crate) fn accepting() -> Self {
            Self {
                verify: VerifyResponse {
                    is_valid: true,
                    invalid_reason: None,
                    payer: Some("0xpayer".into()),
                },
                settle: SettleResponse {
                    success: true,
                    error_reason: None,
                    transaction: Some("0xtx".into()),
                    network: Some("eip155:84532".into()),
                    payer: Some("0xpayer".into()),
                },
                settled: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Facilitator for StaticFacilitator {
        async fn verify(
            &self,
            _payload: &PaymentPayload,
            _requirements: &PaymentRequirements,
        ) -> Result<VerifyResponse, ProviderError> {
            Ok(self.verify.clone())
        }

        async fn settle(
            &self,
            _payload: &PaymentPayload,
            _requirements: &PaymentRequirements,
        ) -> Result<SettleResponse, ProviderError> {
            *self.settled.lock().unwrap() += 1;
            Ok(self.settle.clone())
        }
    }

    fn config() -> PaymentConfig {
        PaymentConfig {
            pay_to: Some("0xpay".into()),
            ..PaymentConfig::default()
        }
    }

    fn header_value() -> String {
        let raw = serde_json::json!({
            "x402Version": 2,
            "payload": {"authorization": {"from": "0xclaimed"}}
        });
        base64::engine::general_purpose::STANDARD.encode(raw.to_string())
    }

    #[tokio::test]
    async fn missing_header_requires_payment() {
        let gate = PaymentGate::new(
            &config(),
            "http://localhost/api",
            Arc::new(StaticFacilitator::accepting()),
        )
        .unwrap();
        assert!(matches!(
            gate.verify(None).await.unwrap_err(),
            PaymentError::Missing
        ));
        assert!(matches!(
            gate.verify(Some("  ")).await.unwrap_err(),
            PaymentError::Missing
        ));
    }

    #[tokio::test]
    async fn valid_payment_yields_payer() {
        let gate = PaymentGate::new(
            &config(),
            "http://localhost/api",
            Arc::new(StaticFacilitator::accepting()),
        )
        .unwrap();
        let verified = gate.verify(Some(&header_value())).await.unwrap();
        assert_eq!(verified.payer.as_deref(), Some("0xpayer"));
        let settled = gate.settle(&verified).await.unwrap();
        assert_eq!(settled.transaction.as_deref(), Some("0xtx"));
    }

    #[tokio::test]
    async fn rejected_payment_carries_reason() {
        let mut fac = StaticFacilitator::accepting();
        fac.verify = VerifyResponse {
            is_valid: false,
            invalid_reason: Some("insufficient_funds".into()),
            payer: None,
        };
        let gate = PaymentGate::new(&config(), "http://localhost/api", Arc::new(fac)).unwrap();
        let err = gate.verify(Some(&header_value())).await.unwrap_err();
        assert!(err.is_payment_required());
        assert_eq!(
            crate::errors::sanitize_message(&err.to_string()),
            "Insufficient funds. Please add USDC to your wallet."
        );
    }

    #[test]
    fn gate_requires_pay_to() {
        let cfg = PaymentConfig::default();
        let err = PaymentGate::new(
            &cfg,
            "http://localhost/api",
            Arc::new(StaticFacilitator::accepting()),
        )
        .err()
        .unwrap();
        assert!(!err.is_payment_required());
    }

    #[test]
    fn payment_required_body() {
        let gate = PaymentGate::new(
            &config(),
            "http://localhost/api/workflows/seo-analysis",
            Arc::new(StaticFacilitator::accepting()),
        )
        .unwrap();
        let body = serde_json::to_value(gate.payment_required(None)).unwrap();
        assert_eq!(body["x402Version"], 2);
        assert_eq!(body["error"], "Payment required");
        assert_eq!(body["resource"]["mimeType"], "application/json");
        assert_eq!(body["accepts"][0]["amount"], "500000");
    }
}
