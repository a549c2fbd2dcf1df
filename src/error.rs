//! Error types for the dashboard

use thiserror::Error;

/// Result type alias for dashboard operations
pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Error, Debug)]
pub enum DashboardError {

    // =============================
    // Agent / Tool Errors
    // =============================

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    // =============================
    // Request / Config Errors
    // =============================

    #[error("Missing API keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_message_lists_labels() {
        let err = DashboardError::MissingKeys(vec!["Google".into(), "Finnhub".into()]);
        assert_eq!(err.to_string(), "Missing API keys: Google, Finnhub");
    }
}
