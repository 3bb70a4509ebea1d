//! HTTP layer shared by the LLM, extractor and facilitator clients: status
//! mapping and retry.
//!
//! This is the ONLY place for status code handling. Service clients never
//! interpret status codes.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Errors from a hosted service.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{service} unauthorized ({status}): {message}")]
    Unauthorized {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} rate limited (429): {message}")]
    RateLimited {
        service: &'static str,
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("{service} API error ({status}): {message}")]
    Server {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} API error ({status}): {message}")]
    Client {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("{service} network error: {message}")]
    Network {
        service: &'static str,
        message: String,
    },

    #[error("{service} invalid response: {message}")]
    InvalidResponse {
        service: &'static str,
        message: String,
    },

    #[error("configuration error: {message}")]
    Config { message: String },
}

impl ProviderError {
    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Network { .. }
        )
    }

    pub(crate) fn invalid(service: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }

    fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            format!("request timed out: {err}")
        } else {
            // Include the source chain: reqwest's top-level Display omits the
            // underlying io error ("connection refused", dns failures).
            let mut msg = err.to_string();
            let mut source = std::error::Error::source(&err);
            while let Some(s) = source {
                msg.push_str(": ");
                msg.push_str(&s.to_string());
                source = s.source();
            }
            msg
        };
        Self::Network { service, message }
    }
}

/// How a backend authenticates.
#[derive(Debug, Clone)]
pub enum Auth {
    None,
    Bearer(String),
    Header { name: &'static str, value: String },
}

/// Retry settings.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Backoff before retry `n` is `base * 2^n`, capped at 30s, full jitter.
    pub base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base: Duration::from_millis(500),
        }
    }
}

/// JSON-over-HTTP backend (holds reqwest client, auth, retry policy).
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    service: &'static str,
    auth: Auth,
    retry: RetryPolicy,
}

impl HttpBackend {
    pub fn new(
        service: &'static str,
        base_url: &str,
        auth: Auth,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("seogap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service,
            auth,
            retry,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` to `{base_url}{path}` and decode the JSON response.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self.request(&url, body).await?;
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.service, e))?;
        serde_json::from_str(&text).map_err(|e| {
            debug!(service = self.service, body = %truncate(&text, 500), "undecodable response body");
            ProviderError::invalid(self.service, format!("failed to decode {path}: {e}"))
        })
    }

    async fn request<B>(&self, url: &str, body: &B) -> Result<reqwest::Response, ProviderError>
    where
        B: Serialize + ?Sized,
    {
        use rand::Rng;

        let mut retries = 0;
        let max_retries = self.retry.max_retries;

        loop {
            let result = self.request_once(url, body).await;

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;

                    let backoff = match &e {
                        ProviderError::RateLimited {
                            retry_after: Some(retry_after),
                            ..
                        } => {
                            let capped = (*retry_after).min(Duration::from_secs(30));
                            let base_ms = capped.as_millis() as u64;
                            let jitter_factor: f64 =
                                rand::thread_rng().gen_range(0.9_f64..=1.1_f64);
                            let jittered_ms = ((base_ms as f64) * jitter_factor).round() as u64;
                            Duration::from_millis(jittered_ms.max(100))
                        }
                        _ => {
                            let base_backoff = self.retry.base.saturating_mul(1 << retries);
                            let base_backoff = base_backoff.min(Duration::from_secs(30));
                            let jittered_ms =
                                rand::thread_rng().gen_range(0..=base_backoff.as_millis() as u64);
                            Duration::from_millis(jittered_ms.max(10))
                        }
                    };

                    warn!(
                        service = self.service,
                        error = %e,
                        retry = retries,
                        max_retries = max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying request"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once<B>(&self, url: &str, body: &B) -> Result<reqwest::Response, ProviderError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.client.post(url).json(body);

        match &self.auth {
            Auth::None => {}
            Auth::Bearer(token) => {
                request = request.header(AUTHORIZATION, format!("Bearer {}", token));
            }
            Auth::Header { name, value } => {
                request = request.header(*name, value);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(self.service, e))?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => Ok(response),

            401 | 403 => Err(ProviderError::Unauthorized {
                service: self.service,
                status: status.as_u16(),
                message: body_text(response, status).await,
            }),

            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);

                Err(ProviderError::RateLimited {
                    service: self.service,
                    retry_after,
                    message: body_text(response, status).await,
                })
            }

            500..=599 => Err(ProviderError::Server {
                service: self.service,
                status: status.as_u16(),
                message: body_text(response, status).await,
            }),

            _ => Err(ProviderError::Client {
                service: self.service,
                status: status.as_u16(),
                message: body_text(response, status).await,
            }),
        }
    }
}

async fn body_text(response: reqwest::Response, status: StatusCode) -> String {
    let text = response.text().await.unwrap_or_default();
    if text.trim().is_empty() {
        status.to_string()
    } else {
        truncate(&text, 1000).to_string()
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
