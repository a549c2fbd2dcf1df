//! Daily price history from Yahoo Finance

use super::{ensure_object_parameters, require_date, require_str, Tool};
use crate::error::DashboardError;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjclose: f64,
    pub volume: u64,
}

pub async fn fetch_history(symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<Vec<PriceBar>> {
    let start_odt = to_offset(start)?;
    let end_odt = to_offset(exclusive_end(end)?)?;

    let provider = yahoo::YahooConnector::new().map_err(yahoo_error)?;

    let response = provider
        .get_quote_history(symbol, start_odt, end_odt)
        .await
        .map_err(yahoo_error)?;

    let quotes = response.quotes().map_err(yahoo_error)?;

    Ok(quotes
        .iter()
        .map(|q| PriceBar {
            date: DateTime::from_timestamp(q.timestamp as i64, 0).unwrap_or_else(Utc::now),
            open: q.open,
            high: q.high,
            low: q.low,
            close: q.close,
            adjclose: q.adjclose,
            volume: q.volume,
        })
        .collect())
}

/// Yahoo treats the end bound as exclusive
fn exclusive_end(end: NaiveDate) -> Result<NaiveDate> {
    end.checked_add_days(chrono::Days::new(1)).ok_or_else(|| {
        DashboardError::InvalidToolInput(format!("get_stock_data: end_date {} is out of range", end))
    })
}

fn to_offset(date: NaiveDate) -> Result<OffsetDateTime> {
    let ts = date
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc().timestamp())
        .ok_or_else(|| DashboardError::ToolError(format!("Invalid date {}", date)))?;
    OffsetDateTime::from_unix_timestamp(ts)
        .map_err(|e| DashboardError::ToolError(format!("Invalid timestamp for {}: {}", date, e)))
}

fn yahoo_error(e: yahoo::YahooError) -> DashboardError {
    DashboardError::ToolError(format!("Yahoo Finance error: {}", e))
}

/// Render bars as a compact CSV table the model can read
pub fn format_history(symbol: &str, bars: &[PriceBar]) -> String {
    if bars.is_empty() {
        return format!("No price data found for {} in the requested window.", symbol);
    }

    let mut out = format!("[Stock Data for {}]\nDate,Open,High,Low,Close,Adj Close,Volume\n", symbol);
    for bar in bars {
        out.push_str(&format!(
            "{},{:.2},{:.2},{:.2},{:.2},{:.2},{}\n",
            bar.date.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.adjclose,
            bar.volume
        ));
    }

    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        if first.close > 0.0 {
            let change = (last.close - first.close) / first.close * 100.0;
            out.push_str(&format!("\nChange over window: {:+.2}%\n", change));
        }
    }
    out
}

pub struct StockDataTool;

impl StockDataTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StockDataTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Tool for StockDataTool {
    fn name(&self) -> &'static str {
        "get_stock_data"
    }

    fn description(&self) -> &'static str {
        "get stock data"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": {"type": "string", "description": "Ticker symbol, e.g. TCS.NS"},
                "start_date": {"type": "string", "description": "Start date in YYYY-MM-DD"},
                "end_date": {"type": "string", "description": "End date in YYYY-MM-DD"}
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
                "get_stock_data: start_date {} is after end_date {}",
                start, end
            )));
        }

        let bars = fetch_history(&symbol, start, end).await?;
        Ok(ToolOutput::text(format_history(&symbol, &bars)))
    }
}
