//! Chat model backends
//!
//! Both backends speak the same provider-neutral [`ChatRequest`] so the
//! agent loop never needs to know which hosted API it is talking to.

use crate::config::{Backend, LlmConfig};
use crate::models::{Message, ToolCall, ToolDeclaration};
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub mod gemini;
pub mod groq;

pub use gemini::GeminiClient;
pub use groq::GroqClient;

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDeclaration>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

/// A hosted LLM capable of function calling
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// Build the client for the configured backend
pub fn build_model(config: &LlmConfig, api_key: &str) -> Result<Arc<dyn ChatModel>> {
    let model: Arc<dyn ChatModel> = match config.backend {
        Backend::Gemini => Arc::new(GeminiClient::new(api_key.to_string(), config)?),
        Backend::Groq => Arc::new(GroqClient::new(api_key.to_string(), config)?),
    };
    Ok(model)
}

pub(crate) fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .pool_max_idle_per_host(8)
        .timeout(config.timeout)
        .build()?)
}
