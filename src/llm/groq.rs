//! Groq API client (OpenAI-compatible chat completions)

use super::{http_client, ChatModel, ChatRequest, ChatResponse};
use crate::config::LlmConfig;
use crate::error::DashboardError;
use crate::models::{Message, Role, ToolCall, ToolDeclaration};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

const BASE_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

pub struct GroqClient {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
}

impl GroqClient {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ChatModel for GroqClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(DashboardError::LlmError(
                "GROQ_API_KEY not configured".to_string(),
            ));
        }

        let body = build_request(&self.model, self.temperature, request);

        debug!(
            model = %self.model,
            messages = body.messages.len(),
            "Calling Groq API"
        );

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("Groq API request failed: {}", e);
                DashboardError::LlmError(format!("Groq API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Groq API error response: {}", error_text);
            return Err(DashboardError::LlmError(format!(
                "Groq API returned {}: {}",
                status, error_text
            )));
        }

        let groq_response: GroqResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            error!("Failed to parse Groq response: {}", e);
            DashboardError::LlmError(format!("Groq parse error: {}", e))
        })?;

        let parsed = parse_response(groq_response)?;

        info!(
            model = %self.model,
            tool_calls = parsed.tool_calls.len(),
            "Groq response received"
        );

        Ok(parsed)
    }
}

fn build_request(model: &str, temperature: f32, request: &ChatRequest) -> GroqRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);

    messages.push(GroqMessage {
        role: "system".to_string(),
        content: Some(request.system.clone()),
        tool_calls: None,
        tool_call_id: None,
        name: None,
    });

    messages.extend(request.messages.iter().map(convert_message));

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(request.tools.iter().map(GroqTool::from).collect())
    };

    GroqRequest {
        model: model.to_string(),
        messages,
        temperature,
        tools,
    }
}

fn convert_message(message: &Message) -> GroqMessage {
    match message.role {
        Role::User => GroqMessage {
            role: "user".to_string(),
            content: Some(message.text().to_string()),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        },
        Role::Assistant => GroqMessage {
            role: "assistant".to_string(),
            content: message.content.clone(),
            tool_calls: if message.tool_calls.is_empty() {
                None
            } else {
                Some(
                    message
                        .tool_calls
                        .iter()
                        .map(|call| GroqToolCall {
                            id: call.id.clone(),
                            tool_type: "function".to_string(),
                            function: GroqFunctionCall {
                                name: call.name.clone(),
                                arguments: call.arguments.to_string(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: None,
            name: None,
        },
        Role::Tool => GroqMessage {
            role: "tool".to_string(),
            content: Some(message.text().to_string()),
            tool_calls: None,
            tool_call_id: message.tool_call_id.clone(),
            name: message.name.clone(),
        },
    }
}

fn parse_response(response: GroqResponse) -> Result<ChatResponse> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| DashboardError::LlmError("No choices in Groq response".to_string()))?;

    let mut tool_calls = Vec::new();
    for call in choice.message.tool_calls.unwrap_or_default() {
        // Models occasionally emit an empty string for no-argument calls
        let arguments = if call.function.arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&call.function.arguments).map_err(|e| {
                DashboardError::LlmError(format!(
                    "Invalid arguments for {}: {}",
                    call.function.name, e
                ))
            })?
        };
        tool_calls.push(ToolCall {
            id: call.id,
            name: call.function.name,
            arguments,
        });
    }

    Ok(ChatResponse {
        content: choice.message.content.filter(|c| !c.is_empty()),
        tool_calls,
    })
}

#[derive(Debug, Serialize)]
struct GroqRequest {
    model: String,
    messages: Vec<GroqMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GroqTool>>,
}

#[derive(Debug, Serialize)]
struct GroqMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<GroqToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroqToolCall {
    id: String,
    #[serde(rename = "type", default)]
    tool_type: String,
    function: GroqFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct GroqFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct GroqTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: GroqFunction,
}

#[derive(Debug, Serialize)]
struct GroqFunction {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolDeclaration> for GroqTool {
    fn from(decl: &ToolDeclaration) -> Self {
        Self {
            tool_type: "function".to_string(),
            function: GroqFunction {
                name: decl.name.clone(),
                description: decl.description.clone(),
                parameters: decl.parameters.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    #[serde(default)]
    choices: Vec<GroqChoice>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: GroqResponseMessage,
}

#[derive(Debug, Deserialize)]
struct GroqResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<GroqToolCall>>,
}
