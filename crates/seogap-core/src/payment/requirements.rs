//! x402 payment requirements for the paid submission endpoint.

use super::PaymentError;
use serde::{Deserialize, Serialize};

pub const X402_VERSION: u32 = 2;
const USDC_DECIMALS: u32 = 6;

const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
const USDC_BASE_SEPOLIA: &str = "0x036CbD53842c5426634e7929541eC2318f3dCF7e";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Base,
    BaseSepolia,
}

impl Network {
    pub fn parse(s: &str) -> Result<Self, PaymentError> {
        match s.trim() {
            "base" | "eip155:8453" => Ok(Network::Base),
            "base-sepolia" | "eip155:84532" => Ok(Network::BaseSepolia),
            other => Err(PaymentError::Config(format!("unsupported network: {other}"))),
        }
    }

    /// CAIP-2 chain identifier.
    pub fn caip2(&self) -> &'static str {
        match self {
            Network::Base => "eip155:8453",
            Network::BaseSepolia => "eip155:84532",
        }
    }

    pub fn usdc_address(&self) -> &'static str {
        match self {
            Network::Base => USDC_BASE,
            Network::BaseSepolia => USDC_BASE_SEPOLIA,
        }
    }
}

/// `$0.50` -> `500000` (USDC base units). Truncates below one unit.
pub fn parse_price_units(price: &str) -> Result<u64, PaymentError> {
    let s = price.trim().trim_start_matches('$').trim();
    let bad = || PaymentError::Config(format!("invalid price: {price:?}"));

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(bad());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| bad())?
    };
    let mut frac_digits: String = frac.chars().take(USDC_DECIMALS as usize).collect();
    while frac_digits.len() < USDC_DECIMALS as usize {
        frac_digits.push('0');
    }
    let frac: u64 = frac_digits.parse().map_err(|_| bad())?;

    whole
        .checked_mul(10u64.pow(USDC_DECIMALS))
        .and_then(|w| w.checked_add(frac))
        .filter(|units| *units > 0)
        .ok_or_else(bad)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetExtra {
    pub name: String,
    pub version: String,
}

/// One accepted way to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    pub asset: String,
    pub amount: String,
    pub pay_to: String,
    pub max_timeout_seconds: u64,
    pub extra: AssetExtra,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    pub url: String,
    pub description: String,
    pub mime_type: String,
}

/// Body (and `PAYMENT-REQUIRED` header content) of a 402 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    pub x402_version: u32,
    pub error: String,
    pub resource: ResourceInfo,
    pub accepts: Vec<PaymentRequirements>,
}

impl PaymentRequirements {
    pub fn exact_usdc(network: Network, price: &str, pay_to: &str) -> Result<Self, PaymentError> {
        Ok(Self {
            scheme: "exact".to_string(),
            network: network.caip2().to_string(),
            asset: network.usdc_address().to_string(),
            amount: parse_price_units(price)?.to_string(),
            pay_to: pay_to.to_string(),
            max_timeout_seconds: 300,
            extra: AssetExtra {
                name: "USD Coin".to_string(),
                version: "2".to_string(),
            },
        })
    }
}

impl PaymentRequired {
    pub fn new(resource: ResourceInfo, accepts: Vec<PaymentRequirements>) -> Self {
        Self {
            x402_version: X402_VERSION,
            error: "Payment required".to_string(),
            resource,
            accepts,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }
}
