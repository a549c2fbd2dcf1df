//! Text helpers exposed to the report agent

use super::{ensure_object_parameters, optional_u64, Tool};
use crate::error::DashboardError;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use serde_json::{json, Value};

const DEFAULT_MAX_WORDS: u64 = 100_000;

/// Word-count check against inclusive bounds
pub fn check_text_length(text: &str, min_length: u64, max_length: u64) -> String {
    let words = text.split_whitespace().count() as u64;
    if words < min_length {
        format!(
            "Text is too short: {} words, minimum is {}.",
            words, min_length
        )
    } else if words > max_length {
        format!(
            "Text is too long: {} words, maximum is {}.",
            words, max_length
        )
    } else {
        format!("Text length OK: {} words.", words)
    }
}

pub struct CheckTextLengthTool;

#[async_trait::async_trait]
impl Tool for CheckTextLengthTool {
    fn name(&self) -> &'static str {
        "check_text_length"
    }

    fn description(&self) -> &'static str {
        "check text length"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "Text to measure"},
                "min_length": {"type": "integer", "description": "Minimum number of words, default 0"},
                "max_length": {"type": "integer", "description": "Maximum number of words, default 100000"}
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        // Empty text is a valid measurement, not a missing argument
        let text = input
            .parameters
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DashboardError::InvalidToolInput(format!(
                    "{}: 'text' must be a string",
                    input.tool_name
                ))
            })?;
        let min = optional_u64(input, "min_length")?.unwrap_or(0);
        let max = optional_u64(input, "max_length")?.unwrap_or(DEFAULT_MAX_WORDS);

        Ok(ToolOutput::text(check_text_length(text, min, max)))
    }
}
