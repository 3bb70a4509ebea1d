pub mod openai;

use async_trait::async_trait;
use schemars::JsonSchema;

pub use openai::OpenAiClient;

/// Output format requested from the model.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    Text,
    /// Any JSON object.
    JsonObject,
    /// JSON constrained by a schema.
    JsonSchema {
        name: &'static str,
        schema: serde_json::Value,
    },
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub format: ResponseFormat,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.3,
            max_tokens: None,
            format: ResponseFormat::Text,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// JSON output. With `structured` set, the schema of `T` constrains it.
    pub fn json<T: JsonSchema>(mut self, name: &'static str, structured: bool) -> Self {
        self.format = if structured {
            ResponseFormat::JsonSchema {
                name,
                schema: serde_json::to_value(schemars::schema_for!(T))
                    .unwrap_or(serde_json::Value::Null),
            }
        } else {
            ResponseFormat::JsonObject
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub meta: serde_json::Value,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> anyhow::Result<LlmResponse>;
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(JsonSchema)]
    #[allow(dead_code)]
    struct Topics {
        common_topics: Vec<String>,
    }

    #[test]
    fn json_format_follows_structured_flag() {
        let plain = ChatRequest::new("p").json::<Topics>("topics", false);
        assert_eq!(plain.format, ResponseFormat::JsonObject);

        let structured = ChatRequest::new("p").json::<Topics>("topics", true);
        match structured.format {
            ResponseFormat::JsonSchema { name, schema } => {
                assert_eq!(name, "topics");
                assert!(schema["properties"]["common_topics"].is_object());
            }
            other => panic!("unexpected format {other:?}"),
        }
    }
}
