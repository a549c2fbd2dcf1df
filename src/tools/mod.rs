//! Tool trait and registry
//!
//! Tools wrap the market-data APIs the agents are allowed to call. Each tool
//! publishes a JSON schema so the model knows how to call it.

use crate::config::ApiKeys;
use crate::error::DashboardError;
use crate::models::{ToolDeclaration, ToolInput, ToolOutput};
use crate::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub mod finnhub;
pub mod fmp;
pub mod text;
pub mod yahoo;

pub use finnhub::FinnhubClient;
pub use fmp::FmpClient;

/// Trait for a single callable tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the accepted arguments
    fn parameters(&self) -> Value;
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Tool names in registration order
    pub fn list(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDeclaration {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Tools for the market forecaster: profile, news, basics and prices
pub fn create_market_registry(keys: &ApiKeys) -> Result<ToolRegistry> {
    let finnhub = Arc::new(FinnhubClient::new(keys.finnhub.clone())?);

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(finnhub::CompanyProfileTool::new(finnhub.clone())));
    registry.register(Arc::new(finnhub::CompanyNewsTool::new(finnhub.clone())));
    registry.register(Arc::new(finnhub::FinancialBasicsTool::new(finnhub)));
    registry.register(Arc::new(yahoo::StockDataTool::new()));
    Ok(registry)
}

/// Tools for the annual report analyzer: filings, statements and text checks
pub fn create_report_registry(keys: &ApiKeys) -> Result<ToolRegistry> {
    let fmp = Arc::new(FmpClient::new(keys.fmp.clone())?);

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(fmp::SecReportTool::new(fmp.clone())));
    for kind in [
        fmp::StatementKind::BalanceSheet,
        fmp::StatementKind::IncomeStatement,
        fmp::StatementKind::CashFlow,
    ] {
        registry.register(Arc::new(fmp::StatementAnalysisTool::new(fmp.clone(), kind)));
    }
    registry.register(Arc::new(fmp::BusinessHighlightsTool::new(fmp)));
    registry.register(Arc::new(text::CheckTextLengthTool));
    Ok(registry)
}

// =============================
// Parameter helpers
// =============================

pub(crate) fn ensure_object_parameters(input: &ToolInput) -> Result<()> {
    if input.parameters.is_object() {
        Ok(())
    } else {
        Err(DashboardError::InvalidToolInput(format!(
            "{}: arguments must be a JSON object",
            input.tool_name
        )))
    }
}

/// First non-empty string among the given parameter names
pub(crate) fn require_str(input: &ToolInput, names: &[&str]) -> Result<String> {
    optional_str(input, names).ok_or_else(|| {
        DashboardError::InvalidToolInput(format!(
            "{}: expected '{}'",
            input.tool_name,
            names.join("' or '")
        ))
    })
}

pub(crate) fn optional_str(input: &ToolInput, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match input.parameters.get(*name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Integers sometimes arrive as strings or floats from the model
pub(crate) fn optional_u64(input: &ToolInput, name: &str) -> Result<Option<u64>> {
    match input.parameters.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .map(Some)
            .ok_or_else(|| invalid_number(input, name)),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| invalid_number(input, name)),
        Some(_) => Err(invalid_number(input, name)),
    }
}

fn invalid_number(input: &ToolInput, name: &str) -> DashboardError {
    DashboardError::InvalidToolInput(format!(
        "{}: '{}' must be a non-negative integer",
        input.tool_name, name
    ))
}

/// Dates are exchanged with the model as `YYYY-MM-DD`
pub(crate) fn require_date(input: &ToolInput, name: &str) -> Result<chrono::NaiveDate> {
    let raw = require_str(input, &[name])?;
    chrono::NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
        DashboardError::InvalidToolInput(format!(
            "{}: '{}' must be formatted as YYYY-MM-DD, got '{}'",
            input.tool_name, name, raw
        ))
    })
}
