//! Finnhub-backed tools: company profile, company news, basic financials

use super::{ensure_object_parameters, optional_str, optional_u64, require_date, require_str, Tool};
use crate::error::DashboardError;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use chrono::{DateTime, NaiveDate};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://finnhub.io/api/v1";
/// Free tier allows 60 calls per minute
const REQUESTS_PER_MINUTE: u32 = 60;
const DEFAULT_MAX_NEWS: u64 = 10;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub ipo: String,
    #[serde(default)]
    pub finnhub_industry: String,
    #[serde(default)]
    pub market_capitalization: f64,
    #[serde(default)]
    pub share_outstanding: f64,
    #[serde(default)]
    pub weburl: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub datetime: i64,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source: String,
}

/// Finnhub REST client with a shared per-minute rate limit
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: SharedRateLimiter,
}

impl FinnhubClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        let quota = Quota::per_minute(
            NonZeroU32::new(REQUESTS_PER_MINUTE).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        if self.api_key.is_empty() {
            return Err(DashboardError::ToolError(
                "FINNHUB_API_KEY is not configured".to_string(),
            ));
        }

        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Finnhub request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .header("X-Finnhub-Token", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                DashboardError::ToolError(format!(
                    "Finnhub request failed for {}: {}",
                    path,
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DashboardError::ToolError(format!(
                "Finnhub returned {} for {}: {}",
                status, path, body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| {
                DashboardError::ToolError(format!("Invalid Finnhub response: {}", e.without_url()))
            })
    }

    pub async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        let raw = self
            .get_json("/stock/profile2", &[("symbol", symbol.to_string())])
            .await?;
        parse_profile(symbol, raw)
    }

    pub async fn company_news(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<NewsArticle>> {
        let raw = self
            .get_json(
                "/company-news",
                &[
                    ("symbol", symbol.to_string()),
                    ("from", from.format("%Y-%m-%d").to_string()),
                    ("to", to.format("%Y-%m-%d").to_string()),
                ],
            )
            .await?;
        Ok(serde_json::from_value(raw)?)
    }

    pub async fn basic_financials(&self, symbol: &str) -> Result<Value> {
        self.get_json(
            "/stock/metric",
            &[("symbol", symbol.to_string()), ("metric", "all".to_string())],
        )
        .await
    }
}

fn parse_profile(symbol: &str, raw: Value) -> Result<CompanyProfile> {
    // Finnhub answers unknown symbols with an empty object
    if raw.as_object().map(|o| o.is_empty()).unwrap_or(true) {
        return Err(DashboardError::ToolError(format!(
            "No Finnhub profile found for {}",
            symbol
        )));
    }
    Ok(serde_json::from_value(raw)?)
}

pub fn format_profile(profile: &CompanyProfile) -> String {
    format!(
        "[Company Introduction]:\n\n\
         {name} ({ticker}) operates in the {industry} sector and has been publicly traded since {ipo}. \
         It is listed on {exchange} and is based in {country}.\n\n\
         Market capitalization: {cap:.2} million {currency}. \
         Shares outstanding: {shares:.2} million.\n\
         Website: {url}",
        name = profile.name,
        ticker = profile.ticker,
        industry = profile.finnhub_industry,
        ipo = profile.ipo,
        exchange = profile.exchange,
        country = profile.country,
        cap = profile.market_capitalization,
        currency = profile.currency,
        shares = profile.share_outstanding,
        url = profile.weburl,
    )
}

/// Newest `limit` articles, one block per article
pub fn format_news(symbol: &str, mut articles: Vec<NewsArticle>, limit: usize) -> String {
    if articles.is_empty() {
        return format!("No news found for {} in the requested window.", symbol);
    }

    articles.sort_by(|a, b| b.datetime.cmp(&a.datetime));
    articles.truncate(limit);

    let mut out = format!("[Company News for {}]:\n", symbol);
    for article in &articles {
        let date = DateTime::from_timestamp(article.datetime, 0)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "unknown date".to_string());
        out.push_str(&format!(
            "\n[{}] {} ({})\n{}\n",
            date, article.headline, article.source, article.summary
        ));
    }
    out
}

/// Keep only the requested metric columns, if any were requested
pub fn select_metrics(raw: &Value, columns: Option<&[String]>) -> Value {
    let metrics = raw.get("metric").cloned().unwrap_or_else(|| json!({}));
    let Some(columns) = columns.filter(|c| !c.is_empty()) else {
        return metrics;
    };

    let mut selected = Map::new();
    for column in columns {
        if let Some(value) = metrics.get(column) {
            selected.insert(column.clone(), value.clone());
        }
    }
    Value::Object(selected)
}

fn symbol_schema() -> Value {
    json!({
        "type": "string",
        "description": "Ticker symbol of the stock, e.g. RELIANCE.NS"
    })
}

pub struct CompanyProfileTool {
    client: Arc<FinnhubClient>,
}

impl CompanyProfileTool {
    pub fn new(client: Arc<FinnhubClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for CompanyProfileTool {
    fn name(&self) -> &'static str {
        "get_company_profile"
    }

    fn description(&self) -> &'static str {
        "get company profile"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "symbol": symbol_schema() },
            "required": ["symbol"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let symbol = require_str(input, &["symbol", "ticker_symbol"])?;
        let profile = self.client.company_profile(&symbol).await?;
        Ok(ToolOutput::text(format_profile(&profile)))
    }
}

pub struct CompanyNewsTool {
    client: Arc<FinnhubClient>,
}

impl CompanyNewsTool {
    pub fn new(client: Arc<FinnhubClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for CompanyNewsTool {
    fn name(&self) -> &'static str {
        "get_company_news"
    }

    fn description(&self) -> &'static str {
        "get company news"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": symbol_schema(),
                "start_date": {"type": "string", "description": "Start date in YYYY-MM-DD"},
                "end_date": {"type": "string", "description": "End date in YYYY-MM-DD"},
                "max_news_num": {"type": "integer", "description": "Maximum number of news items to return, default 10"}
            },
            "required": ["symbol", "start_date", "end_date"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let symbol = require_str(input, &["symbol", "ticker_symbol"])?;
        let start = require_date(input, "start_date")?;
        let end = require_date(input, "end_date")?;
        if start > end {
            return Err(DashboardError::InvalidToolInput(format!(
                "get_company_news: start_date {} is after end_date {}",
                start, end
            )));
        }
        let limit = optional_u64(input, "max_news_num")?.unwrap_or(DEFAULT_MAX_NEWS) as usize;

        let articles = self.client.company_news(&symbol, start, end).await?;
        Ok(ToolOutput::text(format_news(&symbol, articles, limit)))
    }
}

pub struct FinancialBasicsTool {
    client: Arc<FinnhubClient>,
}

impl FinancialBasicsTool {
    pub fn new(client: Arc<FinnhubClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Tool for FinancialBasicsTool {
    fn name(&self) -> &'static str {
        "get_financial_basics"
    }

    fn description(&self) -> &'static str {
        "get financial basics"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": symbol_schema(),
                "selected_columns": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Metric names to keep, e.g. peTTM, 52WeekHigh. All metrics when omitted."
                }
            },
            "required": ["symbol"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;
        let symbol = require_str(input, &["symbol", "ticker_symbol"])?;
        let columns: Option<Vec<String>> = match input.parameters.get("selected_columns") {
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            Some(Value::String(s)) => Some(s.split(',').map(|c| c.trim().to_string()).collect()),
            _ => optional_str(input, &["columns"]).map(|s| vec![s]),
        };

        let raw = self.client.basic_financials(&symbol).await?;
        let metrics = select_metrics(&raw, columns.as_deref());

        Ok(ToolOutput {
            success: true,
            data: Value::String(serde_json::to_string_pretty(&metrics)?),
            error: None,
        })
    }
}
