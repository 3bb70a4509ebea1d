//! Base64-JSON payment header codec.

use super::PaymentError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// v2 client payment header.
pub const PAYMENT_SIGNATURE: &str = "payment-signature";
/// v1 client payment header.
pub const X_PAYMENT: &str = "x-payment";
/// Requirements header on 402 responses.
pub const PAYMENT_REQUIRED: &str = "payment-required";

/// Signed payment sent by the client. Scheme-specific content stays opaque
/// and is forwarded to the facilitator unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u32,
    pub payload: serde_json::Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PaymentPayload {
    /// `payload.authorization.from` for EIP-3009 payloads.
    pub fn claimed_payer(&self) -> Option<&str> {
        self.payload
            .pointer("/authorization/from")
            .and_then(|v| v.as_str())
    }
}

pub fn encode<T: Serialize>(value: &T) -> Result<String, PaymentError> {
    let json =
        serde_json::to_vec(value).map_err(|e| PaymentError::InvalidHeader(e.to_string()))?;
    Ok(STANDARD.encode(json))
}

pub fn decode<T: DeserializeOwned>(header: &str) -> Result<T, PaymentError> {
    let bytes = STANDARD
        .decode(header.trim())
        .map_err(|e| PaymentError::InvalidHeader(format!("not base64: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| PaymentError::InvalidHeader(format!("not JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_payload_and_keeps_extra_fields() {
        let raw = json!({
            "x402Version": 2,
            "accepted": {"scheme": "exact", "network": "eip155:84532"},
            "payload": {
                "signature": "0xsig",
                "authorization": {"from": "0xpayer", "to": "0xpay", "value": "500000"}
            }
        });
        let header = STANDARD.encode(raw.to_string());
        let p: PaymentPayload = decode(&header).unwrap();
        assert_eq!(p.x402_version, 2);
        assert_eq!(p.claimed_payer(), Some("0xpayer"));
        assert_eq!(p.extra["accepted"]["scheme"], "exact");

        let back: serde_json::Value = serde_json::to_value(&p).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            decode::<PaymentPayload>("%%%"),
            Err(PaymentError::InvalidHeader(_))
        ));
        let not_json = STANDARD.encode("hello");
        assert!(decode::<PaymentPayload>(&not_json).is_err());
    }
}
