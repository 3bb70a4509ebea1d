use super::{ChatRequest, LlmClient, LlmResponse, ResponseFormat};
use crate::config::LlmConfig;
use crate::providers::http::{Auth, HttpBackend, ProviderError, RetryPolicy};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClient {
    pub model: String,
    backend: HttpBackend,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ProviderError::Config {
                message: "LLM API key missing (set OPENAI_API_KEY)".to_string(),
            })?;
        let backend = HttpBackend::new(
            "OpenAI",
            &config.base_url,
            Auth::Bearer(api_key),
            Duration::from_secs(config.timeout_secs),
            RetryPolicy {
                max_retries: config.max_retries,
                ..RetryPolicy::default()
            },
        )?;
        Ok(Self {
            model: config.model.clone(),
            backend,
        })
    }

    fn body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": request.temperature,
        });
        if let Some(max) = request.max_tokens {
            body["max_tokens"] = json!(max);
        }
        match &request.format {
            ResponseFormat::Text => {}
            ResponseFormat::JsonObject => {
                body["response_format"] = json!({ "type": "json_object" });
            }
            ResponseFormat::JsonSchema { name, schema } => {
                body["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": { "name": name, "schema": schema }
                });
            }
        }
        body
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<LlmResponse> {
        let body = self.body(request);
        let json: serde_json::Value = self.backend.post_json("/chat/completions", &body).await?;

        // Parse choices[0].message.content
        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ProviderError::invalid("OpenAI", "response missing content"))?
            .to_string();

        Ok(LlmResponse {
            text,
            provider: "openai".to_string(),
            model: json
                .get("model")
                .and_then(|v| v.as_str())
                .unwrap_or(&self.model)
                .to_string(),
            meta: json.get("usage").cloned().unwrap_or_else(|| json!({})),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
