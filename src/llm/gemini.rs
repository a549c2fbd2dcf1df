//! Gemini API client
//!
//! Speaks the `generateContent` endpoint with function calling enabled.
//! Uses a long-lived reqwest::Client for connection pooling.

use super::{http_client, ChatModel, ChatRequest, ChatResponse};
use crate::config::LlmConfig;
use crate::error::DashboardError;
use crate::models::{Message, Role, ToolCall, ToolDeclaration};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    base_url: String,
}

impl GeminiClient {
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

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(DashboardError::LlmError(
                "GOOGLE_API_KEY not configured".to_string(),
            ));
        }

        let body = build_request(request, self.temperature);

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Calling Gemini API"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!("Gemini API request failed: {}", e);
                DashboardError::LlmError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(DashboardError::LlmError(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            let e = e.without_url();
            error!("Failed to parse Gemini response: {}", e);
            DashboardError::LlmError(format!("Gemini parse error: {}", e))
        })?;

        let parsed = parse_response(gemini_response)?;

        info!(
            model = %self.model,
            tool_calls = parsed.tool_calls.len(),
            "Gemini response received"
        );

        Ok(parsed)
    }
}

/// Translate the neutral request into Gemini's `contents` layout.
///
/// Consecutive tool results are folded into one `user` turn. Gemini expects
/// every `functionResponse` for a model turn to arrive together.
fn build_request(request: &ChatRequest, temperature: f32) -> GeminiRequest {
    let mut contents: Vec<Content> = Vec::with_capacity(request.messages.len());

    for message in &request.messages {
        match message.role {
            Role::User => push_user_part(&mut contents, Part::text(message.text())),
            Role::Assistant => {
                let mut parts = Vec::new();
                if let Some(text) = message.content.as_deref().filter(|t| !t.is_empty()) {
                    parts.push(Part::text(text));
                }
                for call in &message.tool_calls {
                    parts.push(Part {
                        function_call: Some(FunctionCall {
                            name: call.name.clone(),
                            args: call.arguments.clone(),
                        }),
                        ..Part::default()
                    });
                }
                contents.push(Content {
                    role: "model".to_string(),
                    parts,
                });
            }
            Role::Tool => {
                let part = Part {
                    function_response: Some(FunctionResponse {
                        name: message.name.clone().unwrap_or_default(),
                        response: json!({ "content": message.text() }),
                    }),
                    ..Part::default()
                };
                push_user_part(&mut contents, part);
            }
        }
    }

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(vec![GeminiTools {
            function_declarations: request.tools.iter().map(FunctionDeclaration::from).collect(),
        }])
    };

    GeminiRequest {
        contents,
        system_instruction: Some(Content {
            role: String::new(),
            parts: vec![Part::text(&request.system)],
        }),
        tools,
        generation_config: GenerationConfig { temperature },
    }
}

/// Gemini requires alternating roles, so adjacent user-side parts share a turn
fn push_user_part(contents: &mut Vec<Content>, part: Part) {
    match contents.last_mut() {
        Some(last) if last.role == "user" => last.parts.push(part),
        _ => contents.push(Content {
            role: "user".to_string(),
            parts: vec![part],
        }),
    }
}

fn parse_response(response: GeminiResponse) -> Result<ChatResponse> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| DashboardError::LlmError("No response from Gemini API".to_string()))?;

    let content = candidate.content.ok_or_else(|| {
        DashboardError::LlmError(format!(
            "Empty response from Gemini (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ))
    })?;

    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for part in content.parts {
        if let Some(t) = part.text {
            text.push_str(&t);
        }
        if let Some(call) = part.function_call {
            tool_calls.push(ToolCall {
                id: format!("call_{}", tool_calls.len() + 1),
                name: call.name,
                arguments: call.args,
            });
        }
    }

    Ok(ChatResponse {
        content: if text.is_empty() { None } else { Some(text) },
        tool_calls,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTools>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTools {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolDeclaration> for FunctionDeclaration {
    fn from(decl: &ToolDeclaration) -> Self {
        Self {
            name: decl.name.clone(),
            description: decl.description.clone(),
            parameters: decl.parameters.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::test_support::{stub_server, CLOSED_URL};
    use axum::http::StatusCode;

    fn sample_request() -> ChatRequest {
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "get_company_profile".to_string(),
            arguments: json!({"symbol": "RELIANCE.NS"}),
        };
        ChatRequest {
            system: "You are a market analyst".to_string(),
            messages: vec![
                Message::user("Analyze RELIANCE.NS"),
                Message::assistant(None, vec![call.clone()]),
                Message::tool_result(&call, "Reliance Industries ..."),
            ],
            tools: vec![ToolDeclaration {
                name: "get_company_profile".to_string(),
                description: "get company profile".to_string(),
                parameters: json!({"type": "object"}),
            }],
        }
    }

    #[test]
    fn test_request_serialization() {
        let body = serde_json::to_value(build_request(&sample_request(), 0.5)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Analyze RELIANCE.NS");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(
            body["contents"][1]["parts"][0]["functionCall"]["name"],
            "get_company_profile"
        );
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"]["content"],
            "Reliance Industries ..."
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "get_company_profile"
        );
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a market analyst");
        assert_eq!(body["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_parallel_tool_results_share_one_turn() {
        let a = ToolCall {
            id: "call_1".into(),
            name: "get_company_news".into(),
            arguments: json!({}),
        };
        let b = ToolCall {
            id: "call_2".into(),
            name: "get_stock_data".into(),
            arguments: json!({}),
        };
        let request = ChatRequest {
            system: String::new(),
            messages: vec![
                Message::user("go"),
                Message::assistant(None, vec![a.clone(), b.clone()]),
                Message::tool_result(&a, "news"),
                Message::tool_result(&b, "prices"),
            ],
            tools: vec![],
        };

        let body = build_request(&request, 0.5);
        assert_eq!(body.contents.len(), 3);
        assert_eq!(body.contents[2].parts.len(), 2);
        assert!(body.tools.is_none());
    }

    #[test]
    fn test_followup_prompt_joins_tool_turn() {
        let mut request = sample_request();
        request.messages.push(Message::user("Summarize the takeaway"));

        let body = build_request(&request, 0.5);
        assert_eq!(body.contents.len(), 3);
        assert!(body.contents[2].parts[0].function_response.is_some());
        assert_eq!(body.contents[2].parts[1].text.as_deref(), Some("Summarize the takeaway"));
    }

    #[test]
    fn test_parse_function_call_response() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"functionCall": {"name": "get_stock_data", "args": {"symbol": "TCS.NS"}}}
                    ]
                },
                "finishReason": "STOP"
            }]
        });
        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let parsed = parse_response(response).unwrap();

        assert!(parsed.content.is_none());
        assert_eq!(parsed.tool_calls.len(), 1);
        assert_eq!(parsed.tool_calls[0].name, "get_stock_data");
        assert_eq!(parsed.tool_calls[0].arguments["symbol"], "TCS.NS");
    }

    #[test]
    fn test_parse_empty_candidates_is_error() {
        let response: GeminiResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(parse_response(response).is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let client = GeminiClient::new(String::new(), &LlmConfig::new(crate::config::Backend::Gemini)).unwrap();
        let err = client.complete(&sample_request()).await.unwrap_err();
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
    }

    fn client_with_key(key: &str, base_url: &str) -> GeminiClient {
        GeminiClient::new(key.to_string(), &LlmConfig::new(crate::config::Backend::Gemini))
            .unwrap()
            .with_base_url(base_url)
    }

    #[tokio::test]
    async fn test_connection_error_does_not_echo_key() {
        let secret = "AIzaSecretGeminiKey123";
        let client = client_with_key(secret, CLOSED_URL);

        let err = client.complete(&sample_request()).await.unwrap_err();
        assert!(matches!(err, DashboardError::LlmError(_)));
        assert!(!err.to_string().contains(secret));
    }

    #[tokio::test]
    async fn test_error_status_is_reported_without_key_in_url() {
        let secret = "AIzaSecretGeminiKey123";
        let base = stub_server(StatusCode::UNAUTHORIZED).await;
        let client = client_with_key(secret, &base);

        let err = client.complete(&sample_request()).await.unwrap_err();
        let text = err.to_string();
        assert!(matches!(err, DashboardError::LlmError(_)));
        assert!(text.contains("401"));
        // The stub echoes the request URI, so the key must not be in it
        assert!(text.contains(":generateContent"));
        assert!(!text.contains(secret));
    }
}
