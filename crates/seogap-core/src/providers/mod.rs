pub mod extractor;
pub mod http;
pub mod llm;

pub use extractor::{ExtractorClient, PageExtractor, SearchProvider, SearchResult};
pub use http::ProviderError;
pub use llm::{ChatRequest, LlmClient, LlmResponse, OpenAiClient};
