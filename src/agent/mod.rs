//! Two-party agent conversation
//!
//! A [`UserProxyAgent`] opens the chat with a task. The [`AssistantAgent`]
//! answers with text or tool calls. The proxy executes tool calls and feeds
//! the results back, otherwise it sends a short auto-reply. The chat ends when
//! the assistant's message ends with `TERMINATE` or the proxy runs out of
//! auto-replies.

use crate::execution::ExecutionEngine;
use crate::llm::{ChatModel, ChatRequest, ChatResponse};
use crate::models::{ChatResult, Message, Role, ToolDeclaration, TranscriptEntry};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const TERMINATE: &str = "TERMINATE";
pub const DEFAULT_MAX_CONSECUTIVE_AUTO_REPLY: u32 = 10;
pub const DEFAULT_AUTO_REPLY: &str = "Continue. Reply TERMINATE when the task is done.";
pub const SUMMARY_PROMPT: &str = "Summarize the takeaway from the conversation. Do not add any introductory phrases. If the intended request is NOT properly addressed, please point it out.";

/// How the chat result summary is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMethod {
    LastMessage,
    ReflectionWithLlm,
}

/// Content ends with the termination marker
pub fn is_termination_msg(content: Option<&str>) -> bool {
    content
        .map(|c| c.trim().ends_with(TERMINATE))
        .unwrap_or(false)
}

fn strip_terminate(content: &str) -> String {
    let trimmed = content.trim();
    trimmed
        .strip_suffix(TERMINATE)
        .unwrap_or(trimmed)
        .trim_end()
        .to_string()
}

/// LLM-backed assistant
pub struct AssistantAgent {
    name: String,
    system_message: String,
    model: Arc<dyn ChatModel>,
}

impl AssistantAgent {
    pub fn new(
        name: impl Into<String>,
        system_message: impl Into<String>,
        model: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            name: name.into(),
            system_message: system_message.into(),
            model,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    async fn reply(&self, messages: &[Message], tools: &[ToolDeclaration]) -> Result<ChatResponse> {
        let request = ChatRequest {
            system: self.system_message.clone(),
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        };
        self.model.complete(&request).await
    }
}

/// Non-human proxy that executes tools on the assistant's behalf
pub struct UserProxyAgent {
    name: String,
    execution_engine: ExecutionEngine,
    max_consecutive_auto_reply: u32,
    default_auto_reply: String,
}

impl UserProxyAgent {
    pub fn new(name: impl Into<String>, execution_engine: ExecutionEngine) -> Self {
        Self {
            name: name.into(),
            execution_engine,
            max_consecutive_auto_reply: DEFAULT_MAX_CONSECUTIVE_AUTO_REPLY,
            default_auto_reply: DEFAULT_AUTO_REPLY.to_string(),
        }
    }

    pub fn with_max_consecutive_auto_reply(mut self, max: u32) -> Self {
        self.max_consecutive_auto_reply = max;
        self
    }

    pub fn with_default_auto_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_auto_reply = reply.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the conversation to completion
    pub async fn initiate_chat(
        &self,
        assistant: &AssistantAgent,
        message: &str,
        summary_method: SummaryMethod,
    ) -> Result<ChatResult> {
        let start_time = Instant::now();
        let chat_id = Uuid::new_v4();
        let tools = self.execution_engine.declarations();

        info!(
            chat_id = %chat_id,
            proxy = %self.name,
            assistant = %assistant.name,
            tools = ?self.execution_engine.tool_names(),
            "Agent chat: starting"
        );

        let mut messages = vec![Message::user(message)];
        let mut history = vec![self.entry(Role::User, Some(message.to_string()), None)];
        let mut auto_replies: u32 = 0;
        let mut turns: u32 = 0;

        loop {
            let response = assistant.reply(&messages, &tools).await?;
            turns += 1;

            debug!(
                chat_id = %chat_id,
                turn = turns,
                tool_calls = response.tool_calls.len(),
                has_text = response.content.is_some(),
                "Assistant replied"
            );

            let called = if response.tool_calls.is_empty() {
                None
            } else {
                Some(
                    response
                        .tool_calls
                        .iter()
                        .map(|c| c.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", "),
                )
            };
            history.push(TranscriptEntry {
                role: Role::Assistant,
                name: assistant.name.clone(),
                content: response.content.clone(),
                tool_name: called,
            });
            messages.push(Message::assistant(
                response.content.clone(),
                response.tool_calls.clone(),
            ));

            if is_termination_msg(response.content.as_deref()) {
                info!(chat_id = %chat_id, turns, "Agent chat: assistant terminated");
                break;
            }

            if auto_replies >= self.max_consecutive_auto_reply {
                warn!(
                    chat_id = %chat_id,
                    max = self.max_consecutive_auto_reply,
                    "Agent chat: auto-reply limit reached"
                );
                break;
            }

            if response.tool_calls.is_empty() {
                messages.push(Message::user(self.default_auto_reply.clone()));
                history.push(self.entry(Role::User, Some(self.default_auto_reply.clone()), None));
            } else {
                let observations = self
                    .execution_engine
                    .execute_calls(&response.tool_calls)
                    .await;

                for (call, observation) in response.tool_calls.iter().zip(&observations) {
                    let content = observation.content();
                    debug!(
                        chat_id = %chat_id,
                        tool_name = %observation.tool_name,
                        status = ?observation.status,
                        elapsed_ms = observation.execution_time_ms,
                        "Tool observed"
                    );
                    history.push(self.entry(
                        Role::Tool,
                        Some(content.clone()),
                        Some(observation.tool_name.clone()),
                    ));
                    messages.push(Message::tool_result(call, content));
                }
            }

            auto_replies += 1;
        }

        let summary = match summary_method {
            SummaryMethod::LastMessage => last_message_summary(&messages),
            SummaryMethod::ReflectionWithLlm => {
                match self.reflect(assistant, &messages, &tools).await {
                    Ok(Some(summary)) => summary,
                    Ok(None) => last_message_summary(&messages),
                    Err(e) => {
                        warn!(
                            chat_id = %chat_id,
                            error = %e,
                            "Agent chat: reflection failed, using last message"
                        );
                        last_message_summary(&messages)
                    }
                }
            }
        };

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        info!(
            chat_id = %chat_id,
            turns,
            auto_replies,
            elapsed_ms,
            "Agent chat: complete"
        );

        Ok(ChatResult {
            chat_id,
            summary,
            chat_history: history,
            turns,
            elapsed_ms,
        })
    }

    /// One extra model call asking for the takeaway of the whole transcript.
    ///
    /// Tool declarations are resent because providers reject histories that
    /// reference undeclared functions. Any tool calls in the reply are ignored.
    async fn reflect(
        &self,
        assistant: &AssistantAgent,
        messages: &[Message],
        tools: &[ToolDeclaration],
    ) -> Result<Option<String>> {
        let mut transcript = reflection_transcript(messages);
        transcript.push(Message::user(SUMMARY_PROMPT));

        let response = assistant.reply(&transcript, tools).await?;
        Ok(response
            .content
            .map(|c| strip_terminate(&c))
            .filter(|c| !c.is_empty()))
    }

    fn entry(&self, role: Role, content: Option<String>, tool_name: Option<String>) -> TranscriptEntry {
        TranscriptEntry {
            role,
            name: self.name.clone(),
            content,
            tool_name,
        }
    }
}

/// The chat can stop on a message whose tool calls never ran (auto-reply
/// limit, or TERMINATE alongside calls). Providers reject a call without a
/// matching result, so those calls are dropped before reflecting.
fn reflection_transcript(messages: &[Message]) -> Vec<Message> {
    let mut transcript = messages.to_vec();
    if let Some(last) = transcript.last_mut() {
        if last.role == Role::Assistant && !last.tool_calls.is_empty() {
            last.tool_calls.clear();
            if last.text().trim().is_empty() {
                transcript.pop();
            }
        }
    }
    transcript
}

fn last_message_summary(messages: &[Message]) -> String {
    messages
        .iter()
        .rev()
        .filter(|m| m.role == Role::Assistant)
        .filter_map(|m| m.content.as_deref())
        .map(strip_terminate)
        .find(|c| !c.is_empty())
        .unwrap_or_default()
}
