//! Financial Modeling Prep tools: 10-K lookup and statement analysis
//!
//! The `analyze_*` tools do not analyze anything themselves. They fetch the
//! statement for the requested fiscal year and hand it back to the model with
//! an instruction describing what to look for.

use super::{ensure_object_parameters, optional_str, require_str, Tool};
use crate::error::DashboardError;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
const STATEMENT_HISTORY: u32 = 10;

/// Statement fields that carry no financial information
const METADATA_FIELDS: &[&str] = &[
    "symbol",
    "cik",
    "link",
    "finalLink",
    "acceptedDate",
    "fillingDate",
    "reportedCurrency",
    "period",
];

pub struct FmpClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FmpClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        if self.api_key.is_empty() {
            return Err(DashboardError::ToolError(
                "FMP_API_KEY is not configured".to_string(),
            ));
        }

        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "FMP request");

        let response = self
            .client
            .get(&url)
            .query(query)
            // FMP only accepts the key as a query parameter, so errors drop the URL
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                DashboardError::ToolError(format!(
                    "FMP request failed for {}: {}",
                    path,
                    e.without_url()
                ))
            })?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| {
                DashboardError::ToolError(format!("Invalid FMP response: {}", e.without_url()))
            })?;

        if !status.is_success() {
            return Err(DashboardError::ToolError(format!(
                "FMP returned {} for {}: {}",
                status, path, body
            )));
        }

        // FMP reports plan and key problems as 200 with an error message
        if let Some(message) = body.get("Error Message").and_then(Value::as_str) {
            return Err(DashboardError::ToolError(format!("FMP error: {}", message)));
        }

        Ok(body)
    }

    pub async fn sec_filings(&self, ticker: &str) -> Result<Vec<Value>> {
        let body = self
            .get_json(
                &format!("/sec_filings/{}", ticker),
                &[("type", "10-K".to_string()), ("page", "0".to_string())],
            )
            .await?;
        Ok(into_array(body))
    }

    pub async fn statements(&self, ticker: &str, kind: StatementKind) -> Result<Vec<Value>> {
        let body = self
            .get_json(
                &format!("/{}/{}", kind.endpoint(), ticker),
                &[
                    ("period", "annual".to_string()),
                    ("limit", STATEMENT_HISTORY.to_string()),
                ],
            )
            .await?;
        Ok(into_array(body))
    }

    pub async fn profile(&self, ticker: &str) -> Result<Option<Value>> {
        let body = self.get_json(&format!("/profile/{}", ticker), &[]).await?;
        Ok(into_array(body).into_iter().next())
    }
}

fn into_array(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Pick the 10-K for `fyear`, or the newest when no year is given.
///
/// A fiscal year's 10-K is filed in the same or following calendar year, so
/// both are accepted, preferring the later filing.
pub fn select_filing<'a>(filings: &'a [Value], fyear: Option<&str>) -> Option<&'a Value> {
    let Some(year) = fyear.and_then(|y| y.parse::<i32>().ok()) else {
        return filings.first();
    };
    let filed_in = |filing: &Value| -> Option<i32> {
        filing
            .get("fillingDate")
            .and_then(Value::as_str)
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok())
    };
    filings
        .iter()
        .find(|f| filed_in(f) == Some(year + 1))
        .or_else(|| filings.iter().find(|f| filed_in(f) == Some(year)))
}

pub fn format_filing(ticker: &str, filing: Option<&Value>, fyear: Option<&str>) -> String {
    let Some(filing) = filing else {
        return format!(
            "SEC 10-K report not available for {}{}. Use the financial statement tools instead.",
            ticker,
            fyear.map(|y| format!(" (fiscal year {})", y)).unwrap_or_default()
        );
    };

    let link = filing
        .get("finalLink")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| filing.get("link").and_then(Value::as_str))
        .unwrap_or("unavailable");
    let filed = filing
        .get("fillingDate")
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    format!("Link: {}\nFiling Date: {}", link, filed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    BalanceSheet,
    IncomeStatement,
    CashFlow,
}

impl StatementKind {
    fn endpoint(self) -> &'static str {
        match self {
            StatementKind::BalanceSheet => "balance-sheet-statement",
            StatementKind::IncomeStatement => "income-statement",
            StatementKind::CashFlow => "cash-flow-statement",
        }
    }

    fn tool_name(self) -> &'static str {
        match self {
            StatementKind::BalanceSheet => "analyze_balance_sheet",
            StatementKind::IncomeStatement => "analyze_income_stmt",
            StatementKind::CashFlow => "analyze_cash_flow",
        }
    }

    fn tool_description(self) -> &'static str {
        match self {
            StatementKind::BalanceSheet => "analyze balance sheet",
            StatementKind::IncomeStatement => "analyze income statement",
            StatementKind::CashFlow => "analyze cash flow",
        }
    }

    fn title(self) -> &'static str {
        match self {
            StatementKind::BalanceSheet => "Balance Sheet",
            StatementKind::IncomeStatement => "Income Statement",
            StatementKind::CashFlow => "Cash Flow Statement",
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            StatementKind::BalanceSheet => {
                "Review the balance sheet for the fiscal year. Assess liquidity through current assets \
                 against current liabilities, solvency through total debt against equity, and the mix \
                 of the capital structure. Note material changes in cash, receivables, inventory and \
                 borrowings. Conclude in one paragraph under 130 words on the company's financial footing."
            }
            StatementKind::IncomeStatement => {
                "Review the income statement for the fiscal year. Start with revenue and its growth, \
                 then gross, operating and net margins, and earnings per share. Point out unusual \
                 expenses or one-off items. Conclude in one paragraph under 130 words on profitability \
                 and the quality of earnings."
            }
            StatementKind::CashFlow => {
                "Review the cash flow statement for the fiscal year. Compare operating cash flow with \
                 net income, examine capital expenditure and free cash flow, and describe how financing \
                 activities such as debt repayment, buybacks and dividends were funded. Conclude in one \
                 paragraph under 130 words on cash generation and sustainability."
            }
        }
    }
}

/// The statement whose calendar year matches `fyear`, or the newest one
pub fn select_statement<'a>(statements: &'a [Value], fyear: Option<&str>) -> Option<&'a Value> {
    let Some(year) = fyear else {
        return statements.first();
    };
    statements.iter().find(|s| {
        s.get("calendarYear").and_then(Value::as_str) == Some(year)
            || s.get("date")
                .and_then(Value::as_str)
                .map(|d| d.starts_with(year))
                .unwrap_or(false)
    })
}

pub fn format_statement(
    kind: StatementKind,
    ticker: &str,
    fyear: Option<&str>,
    statement: &Value,
) -> String {
    let currency = statement
        .get("reportedCurrency")
        .and_then(Value::as_str)
        .unwrap_or("reported currency");
    let year = statement
        .get("calendarYear")
        .and_then(Value::as_str)
        .or(fyear)
        .unwrap_or("latest");

    let mut out = format!(
        "Instruction: {}\n\n[{} of {} for fiscal year {} ({})]\n",
        kind.instruction(),
        kind.title(),
        ticker,
        year,
        currency
    );

    if let Some(fields) = statement.as_object() {
        for (key, value) in fields {
            if METADATA_FIELDS.contains(&key.as_str()) || value.is_null() {
                continue;
            }
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out.push_str(&format!("{}: {}\n", key, rendered));
        }
    }
    out
}

fn ticker_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "ticker_symbol": {"type": "string", "description": "Ticker symbol, e.g. TCS.NS"},
            "fyear": {"type": "string", "description": "Fiscal year, e.g. 2024"}
        },
        "required": ["ticker_symbol"]
    })
}

pub struct SecReportTool {
    client: Arc<FmpClient>,
}

impl SecReportTool {
    pub fn new(client: Arc<FmpClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for SecReportTool {
    fn name(&self) -> &'static str {
        "get_sec_report"
    }

    fn description(&self) -> &'static str {
        "get SEC report"
    }

    fn parameters(&self) -> Value {
        ticker_schema()
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let ticker = require_str(input, &["ticker_symbol", "symbol"])?;
        let fyear = optional_str(input, &["fyear", "year"]).filter(|y| y != "latest");

        let filings = self.client.sec_filings(&ticker).await?;
        let filing = select_filing(&filings, fyear.as_deref());

        Ok(ToolOutput::text(format_filing(&ticker, filing, fyear.as_deref())))
    }
}

pub struct StatementAnalysisTool {
    client: Arc<FmpClient>,
    kind: StatementKind,
}

impl StatementAnalysisTool {
    pub fn new(client: Arc<FmpClient>, kind: StatementKind) -> Self {
        Self { client, kind }
    }
}

#[async_trait::async_trait]
impl Tool for StatementAnalysisTool {
    fn name(&self) -> &'static str {
        self.kind.tool_name()
    }

    fn description(&self) -> &'static str {
        self.kind.tool_description()
    }

    fn parameters(&self) -> Value {
        ticker_schema()
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let ticker = require_str(input, &["ticker_symbol", "symbol"])?;
        let fyear = optional_str(input, &["fyear", "year"]);

        let statements = self.client.statements(&ticker, self.kind).await?;
        let statement = select_statement(&statements, fyear.as_deref()).ok_or_else(|| {
            DashboardError::ToolError(format!(
                "No {} found for {}{}",
                self.kind.title(),
                ticker,
                fyear
                    .as_deref()
                    .map(|y| format!(" in fiscal year {}", y))
                    .unwrap_or_default()
            ))
        })?;

        Ok(ToolOutput::text(format_statement(
            self.kind,
            &ticker,
            fyear.as_deref(),
            statement,
        )))
    }
}

pub struct BusinessHighlightsTool {
    client: Arc<FmpClient>,
}

impl BusinessHighlightsTool {
    pub fn new(client: Arc<FmpClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for BusinessHighlightsTool {
    fn name(&self) -> &'static str {
        "analyze_business_highlights"
    }

    fn description(&self) -> &'static str {
        "analyze business highlights"
    }

    fn parameters(&self) -> Value {
        ticker_schema()
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let ticker = require_str(input, &["ticker_symbol", "symbol"])?;

        let profile = self.client.profile(&ticker).await?.ok_or_else(|| {
            DashboardError::ToolError(format!("No FMP company profile found for {}", ticker))
        })?;

        Ok(ToolOutput::text(format_highlights(&ticker, &profile)))
    }
}

pub fn format_highlights(ticker: &str, profile: &Value) -> String {
    let field = |name: &str| profile.get(name).and_then(Value::as_str).unwrap_or("n/a");

    format!(
        "Instruction: From the business description below, extract the main business lines, \
         their performance drivers and any notable developments. Write one paragraph under 130 words.\n\n\
         [Business Description of {} ({})]\nSector: {}\nIndustry: {}\nExchange: {}\n\n{}",
        field("companyName"),
        ticker,
        field("sector"),
        field("industry"),
        field("exchangeShortName"),
        field("description"),
    )
}
