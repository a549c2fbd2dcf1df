//! The two hard-coded analyst conversations
//!
//! Each workflow fixes an assistant persona, a proxy, the tool set and the
//! task prompt. The dashboard and the CLI only choose which one to run and
//! for which ticker.

use crate::agent::{AssistantAgent, SummaryMethod, UserProxyAgent};
use crate::config::{ApiKeys, LlmConfig};
use crate::error::DashboardError;
use crate::execution::ExecutionEngine;
use crate::llm::{build_model, ChatModel};
use crate::models::ChatResult;
use crate::tools::{create_market_registry, create_report_registry, ToolRegistry};
use crate::Result;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Fiscal year the annual report analyzer asks about
pub const REPORT_YEAR: &str = "2024";

const MAX_TICKER_LEN: usize = 20;

const FORECASTER_SYSTEM_MESSAGE: &str = "As a Market Analyst for the Indian Stock Market (NSE/BSE), you possess strong analytical abilities. Collect financial info and news using provided tools. Focus on Indian market context, regulatory updates (SEBI), and local economic factors. Reply TERMINATE when the task is done.";

const REPORT_SYSTEM_MESSAGE: &str = "Role: Expert Investor for Indian Markets. Responsibility: Generate Customized Financial Analysis Reports. Use tools to fetch financial statements (Balance Sheet, Income Stmt, Cash Flow). If SEC 10-K is not available (common for Indian stocks), use FMP financial statements directly. Reply TERMINATE when detailed analysis is done.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    Forecast,
    Report,
}

impl Workflow {
    pub const ALL: [Workflow; 2] = [Workflow::Forecast, Workflow::Report];

    pub fn slug(self) -> &'static str {
        match self {
            Workflow::Forecast => "forecast",
            Workflow::Report => "report",
        }
    }

    pub fn agent_name(self) -> &'static str {
        match self {
            Workflow::Forecast => "Market_Analyst",
            Workflow::Report => "Expert_Investor",
        }
    }

    pub fn proxy_name(self) -> &'static str {
        match self {
            Workflow::Forecast => "User_Proxy",
            Workflow::Report => "User_Proxy_Report",
        }
    }

    pub fn system_message(self) -> &'static str {
        match self {
            Workflow::Forecast => FORECASTER_SYSTEM_MESSAGE,
            Workflow::Report => REPORT_SYSTEM_MESSAGE,
        }
    }

    /// Task text the proxy opens the chat with
    pub fn prompt(self, company: &str, today: NaiveDate) -> String {
        match self {
            Workflow::Forecast => format!(
                "Use all tools to retrieve info for {} (Indian Stock) as of {}. \
                 Analyze positive developments and concerns (focus on Indian market impact). \
                 Make a prediction (up/down %) for next week. Provide a summary.",
                company,
                today.format("%Y-%m-%d")
            ),
            Workflow::Report => format!(
                "Analyze the financial health of {} (Indian Stock) for the year {}. \
                 1. Retrieve/Analyze Balance Sheet, Income Statement, and Cash Flow. \
                 2. Summarize key financial metrics (Profitability, Liquidity, Solvency). \
                 3. Provide an investment recommendation based on these metrics. \
                 Format the output as a structured Annual Performance Report.",
                company, REPORT_YEAR
            ),
        }
    }

    fn registry(self, keys: &ApiKeys) -> Result<ToolRegistry> {
        match self {
            Workflow::Forecast => create_market_registry(keys),
            Workflow::Report => create_report_registry(keys),
        }
    }

    // ---- page labels ----

    pub fn tab_label(self) -> &'static str {
        match self {
            Workflow::Forecast => "MARKET FORECASTER",
            Workflow::Report => "ANNUAL REPORT ANALYZER",
        }
    }

    pub fn default_ticker(self) -> &'static str {
        match self {
            Workflow::Forecast => "RELIANCE.NS",
            Workflow::Report => "TCS.NS",
        }
    }

    pub fn subheading(self) -> &'static str {
        match self {
            Workflow::Forecast => "/// MARKET MOMENTUM PREDICTOR",
            Workflow::Report => "/// 10-K / ANNUAL REPORT DEEP DIVE",
        }
    }

    pub fn input_label(self) -> &'static str {
        match self {
            Workflow::Forecast => "TICKER SYMBOL",
            Workflow::Report => "COMPANY TICKER",
        }
    }

    pub fn input_hint(self) -> &'static str {
        match self {
            Workflow::Forecast => "E.g., RELIANCE.NS, TCS.NS, INFY.NS",
            Workflow::Report => "E.g., TCS.NS, INFY.NS",
        }
    }

    pub fn button_label(self) -> &'static str {
        match self {
            Workflow::Forecast => "RUN FORECAST",
            Workflow::Report => "ANALYZE REPORT",
        }
    }

    pub fn progress_label(self) -> &'static str {
        match self {
            Workflow::Forecast => "AGENTS DEPLOYED. ANALYZING MARKET DATA...",
            Workflow::Report => "FETCHING AND ANALYZING ANNUAL REPORT...",
        }
    }

    pub fn banner(self) -> &'static str {
        match self {
            Workflow::Forecast => "ANALYSIS COMPLETE",
            Workflow::Report => "REPORT GENERATION COMPLETE",
        }
    }

    pub fn heading(self, company: &str) -> String {
        match self {
            Workflow::Forecast => format!("FORECAST REPORT // {}", company),
            Workflow::Report => format!("ANNUAL PERFORMANCE REPORT // {}", company),
        }
    }

    pub fn log_label(self) -> &'static str {
        match self {
            Workflow::Forecast => "VIEW FULL CONVERSATION LOG",
            Workflow::Report => "VIEW ANALYSIS STEPS",
        }
    }

    /// Check keys, build the model and tools, then run the conversation
    pub async fn run(self, ticker: &str, keys: &ApiKeys, llm: &LlmConfig) -> Result<WorkflowReport> {
        keys.ensure_complete()?;
        let ticker = normalize_ticker(ticker)?;

        let model = build_model(llm, &keys.llm)?;
        let registry = self.registry(keys)?;

        self.converse(&ticker, model, registry).await
    }

    /// Run the conversation with an already-built model and tool set
    pub async fn converse(
        self,
        ticker: &str,
        model: Arc<dyn ChatModel>,
        registry: ToolRegistry,
    ) -> Result<WorkflowReport> {
        let ticker = normalize_ticker(ticker)?;
        let model_name = model.model_name().to_string();

        info!(
            workflow = %self,
            ticker = %ticker,
            model = %model_name,
            "Workflow: starting"
        );

        let assistant = AssistantAgent::new(self.agent_name(), self.system_message(), model);
        let proxy = UserProxyAgent::new(self.proxy_name(), ExecutionEngine::new(registry));

        let message = self.prompt(&ticker, Local::now().date_naive());
        let chat = proxy
            .initiate_chat(&assistant, &message, SummaryMethod::ReflectionWithLlm)
            .await?;

        info!(
            workflow = %self,
            ticker = %ticker,
            turns = chat.turns,
            elapsed_ms = chat.elapsed_ms,
            "Workflow: complete"
        );

        Ok(WorkflowReport {
            workflow: self,
            ticker,
            model: model_name,
            chat,
        })
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for Workflow {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "forecast" | "forecaster" | "market" => Ok(Workflow::Forecast),
            "report" | "annual" | "annual-report" => Ok(Workflow::Report),
            other => Err(DashboardError::ConfigError(format!(
                "unknown workflow '{}', expected forecast or report",
                other
            ))),
        }
    }
}

/// Result of one workflow run, as rendered by the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    pub workflow: Workflow,
    pub ticker: String,
    pub model: String,
    #[serde(flatten)]
    pub chat: ChatResult,
}

impl WorkflowReport {
    pub fn heading(&self) -> String {
        self.workflow.heading(&self.ticker)
    }
}

/// Trim and upper-case a ticker such as `reliance.ns`
pub fn normalize_ticker(raw: &str) -> Result<String> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(DashboardError::InvalidTicker(
            "ticker must not be empty".to_string(),
        ));
    }
    if ticker.len() > MAX_TICKER_LEN
        || !ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '&' | '_'))
    {
        return Err(DashboardError::InvalidTicker(format!(
            "'{}' is not a valid ticker symbol",
            raw.trim()
        )));
    }
    Ok(ticker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::test_support::{calls, text, ScriptedModel};
    use crate::agent::SUMMARY_PROMPT;
    use crate::config::Backend;
    use crate::models::Role;
    use crate::tools::test_support::EchoTool;

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker("  reliance.ns ").unwrap(), "RELIANCE.NS");
        assert_eq!(normalize_ticker("^nsei").unwrap(), "^NSEI");
        assert_eq!(normalize_ticker("m&m.ns").unwrap(), "M&M.NS");

        for bad in ["", "   ", "TCS NS", "<script>", "ABCDEFGHIJKLMNOPQRSTUVWXYZ"] {
            assert!(matches!(
                normalize_ticker(bad),
                Err(DashboardError::InvalidTicker(_))
            ));
        }
    }

    #[test]
    fn test_prompts() {
        let today = NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();

        let forecast = Workflow::Forecast.prompt("TCS.NS", today);
        assert!(forecast.starts_with("Use all tools to retrieve info for TCS.NS (Indian Stock) as of 2024-11-05."));
        assert!(forecast.contains("Make a prediction (up/down %) for next week."));

        let report = Workflow::Report.prompt("INFY.NS", today);
        assert!(report.starts_with("Analyze the financial health of INFY.NS (Indian Stock) for the year 2024."));
        assert!(report.ends_with("structured Annual Performance Report."));

        assert!(Workflow::Forecast.system_message().ends_with("Reply TERMINATE when the task is done."));
        assert!(Workflow::Report.system_message().contains("FMP financial statements"));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Workflow::Forecast.heading("RELIANCE.NS"), "FORECAST REPORT // RELIANCE.NS");
        assert_eq!(Workflow::Report.heading("TCS.NS"), "ANNUAL PERFORMANCE REPORT // TCS.NS");
        assert_eq!("annual".parse::<Workflow>().unwrap(), Workflow::Report);
        assert!("charts".parse::<Workflow>().is_err());
    }

    #[tokio::test]
    async fn test_run_requires_keys() {
        let keys = ApiKeys::new(Backend::Gemini, "g".into(), String::new(), String::new());
        let err = Workflow::Forecast
            .run("TCS.NS", &keys, &LlmConfig::new(Backend::Gemini))
            .await
            .unwrap_err();
        match err {
            DashboardError::MissingKeys(missing) => assert_eq!(missing, vec!["FMP", "Finnhub"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_run_rejects_blank_ticker() {
        let keys = ApiKeys::new(Backend::Groq, "g".into(), "m".into(), "f".into());
        let err = Workflow::Report
            .run("  ", &keys, &LlmConfig::new(Backend::Groq))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::InvalidTicker(_)));
    }

    #[tokio::test]
    async fn test_converse_forecast() {
        let model = Arc::new(ScriptedModel::new(vec![
            calls(&["get_company_profile"]),
            text("Reliance: expect +1.5% next week.\nTERMINATE"),
            text("Reliance likely up 1.5% next week."),
        ]));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool { name: "get_company_profile", fail: false }));

        let report = Workflow::Forecast
            .converse("reliance.ns", model.clone(), registry)
            .await
            .unwrap();

        assert_eq!(report.ticker, "RELIANCE.NS");
        assert_eq!(report.model, "scripted");
        assert_eq!(report.chat.summary, "Reliance likely up 1.5% next week.");
        assert_eq!(report.heading(), "FORECAST REPORT // RELIANCE.NS");

        let first = &report.chat.chat_history[0];
        assert_eq!(first.role, Role::User);
        assert_eq!(first.name, "User_Proxy");
        assert!(first.content.as_deref().unwrap().contains("RELIANCE.NS (Indian Stock)"));
        assert_eq!(report.chat.chat_history[1].name, "Market_Analyst");

        let requests = model.requests.lock().unwrap();
        assert_eq!(requests[0].system, FORECASTER_SYSTEM_MESSAGE);
        assert_eq!(requests[0].tools[0].name, "get_company_profile");
        assert_eq!(requests.last().unwrap().messages.last().unwrap().text(), SUMMARY_PROMPT);
    }

    #[test]
    fn test_report_serializes_flat() {
        let report = WorkflowReport {
            workflow: Workflow::Report,
            ticker: "TCS.NS".into(),
            model: "llama-3.3-70b-versatile".into(),
            chat: ChatResult {
                chat_id: uuid::Uuid::new_v4(),
                summary: "Strong balance sheet".into(),
                chat_history: vec![],
                turns: 3,
                elapsed_ms: 1200,
            },
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["workflow"], "report");
        assert_eq!(value["summary"], "Strong balance sheet");
        assert_eq!(value["turns"], 3);
    }
}
