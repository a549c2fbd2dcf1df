//! FinRobot Dashboard
//!
//! A web dashboard that runs LLM analyst agents over Indian (NSE/BSE) stocks:
//! - Collects API keys from a sidebar form
//! - Runs a two-party agent conversation with function calling
//! - Registers Finnhub, Yahoo Finance and FMP data sources as tools
//! - Renders the summary and transcript in a themed page
//!
//! RUN LOOP:
//! TICKER → PROMPT → ASSISTANT ⇄ TOOLS → TERMINATE → REFLECT → RENDER

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod execution;
pub mod llm;
pub mod models;
pub mod tools;
pub mod ui;
pub mod workflows;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use workflows::{Workflow, WorkflowReport};
