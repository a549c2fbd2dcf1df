//! Execution engine for model-requested tool calls
//!
//! Failures never abort the conversation: they come back as observations so
//! the model can see the error and choose another route.

use crate::models::{ExecutionStatus, Observation, ToolCall, ToolDeclaration, ToolInput};
use crate::tools::ToolRegistry;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Maximum calls honoured from a single model turn
const MAX_CALLS_PER_TURN: usize = 16;

pub struct ExecutionEngine {
    tool_registry: ToolRegistry,
}

impl ExecutionEngine {
    pub fn new(tool_registry: ToolRegistry) -> Self {
        Self { tool_registry }
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tool_registry.declarations()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_registry.list()
    }

    /// Execute the calls of one model turn, in order
    pub async fn execute_calls(&self, calls: &[ToolCall]) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(calls.len());

        for (index, call) in calls.iter().enumerate() {
            if index >= MAX_CALLS_PER_TURN {
                warn!(
                    tool_name = %call.name,
                    "Skipping tool call beyond per-turn limit"
                );
                observations.push(observation(
                    call,
                    ExecutionStatus::Skipped,
                    serde_json::Value::String(format!(
                        "Skipped: at most {} tool calls are executed per turn",
                        MAX_CALLS_PER_TURN
                    )),
                    0,
                ));
                continue;
            }

            debug!(tool_name = %call.name, call_id = %call.id, "Executing tool call");

            let start = Instant::now();
            let input = ToolInput {
                tool_name: call.name.clone(),
                parameters: call.arguments.clone(),
            };

            let (status, output) = match self.tool_registry.get(&call.name) {
                Some(tool) => match tool.execute(&input).await {
                    Ok(output) => (ExecutionStatus::Success, output.data),
                    Err(e) => {
                        warn!(tool_name = %call.name, error = %e, "Tool execution failed");
                        (
                            ExecutionStatus::Failed,
                            serde_json::Value::String(format!("Error: {}", e)),
                        )
                    }
                },
                None => {
                    warn!(tool_name = %call.name, "Tool not registered");
                    (
                        ExecutionStatus::Skipped,
                        serde_json::Value::String("Tool not registered".to_string()),
                    )
                }
            };

            observations.push(observation(
                call,
                status,
                output,
                start.elapsed().as_millis() as u64,
            ));
        }

        observations
    }
}

fn observation(
    call: &ToolCall,
    status: ExecutionStatus,
    tool_output: serde_json::Value,
    execution_time_ms: u64,
) -> Observation {
    Observation {
        observation_id: Uuid::new_v4(),
        call_id: call.id.clone(),
        tool_name: call.name.clone(),
        tool_input: call.arguments.clone(),
        tool_output,
        execution_time_ms,
        created_at: Utc::now(),
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::EchoTool;
    use serde_json::json;
    use std::sync::Arc;

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments: json!({"symbol": "AAPL"}),
        }
    }

    fn engine() -> ExecutionEngine {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "ok_tool", fail: false }));
        registry.register(Arc::new(EchoTool { name: "bad_tool", fail: true }));
        ExecutionEngine::new(registry)
    }

    #[tokio::test]
    async fn test_execution_engine() {
        let observations = engine()
            .execute_calls(&[call("1", "ok_tool"), call("2", "bad_tool"), call("3", "ghost")])
            .await;

        assert_eq!(observations.len(), 3);

        assert_eq!(observations[0].status, ExecutionStatus::Success);
        assert_eq!(observations[0].call_id, "1");
        assert!(observations[0].content().contains("ok_tool <- "));

        assert_eq!(observations[1].status, ExecutionStatus::Failed);
        assert!(observations[1].content().contains("bad_tool exploded"));

        assert_eq!(observations[2].status, ExecutionStatus::Skipped);
        assert_eq!(observations[2].content(), "Tool not registered");
    }

    #[tokio::test]
    async fn test_per_turn_limit() {
        let calls: Vec<ToolCall> = (0..MAX_CALLS_PER_TURN + 2)
            .map(|i| call(&i.to_string(), "ok_tool"))
            .collect();
        let observations = engine().execute_calls(&calls).await;

        assert_eq!(observations.len(), calls.len());
        assert_eq!(
            observations
                .iter()
                .filter(|o| o.status == ExecutionStatus::Skipped)
                .count(),
            2
        );
    }
}
