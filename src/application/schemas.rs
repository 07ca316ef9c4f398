//! API Wire Schemas
//!
//! Response shapes shared by the Results API handlers and the history client.
//! Field names and JSON types follow the documented contract exactly: dates
//! are "YYYY-MM-DD" strings, timestamps RFC 3339 strings, opaque blobs JSON
//! values or null.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::persistence::models::{BacktestDailyResultRecord, BacktestRunRecord};

/// Parse a stored JSON TEXT column, keeping nulls as None
fn parse_json_column(raw: Option<&str>) -> Result<Option<Value>, serde_json::Error> {
    raw.map(serde_json::from_str).transpose()
}

/// Summary of one backtest run (list endpoint row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: String,
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub final_portfolio_value: Option<f64>,
    pub total_return_pct: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub max_drawdown_date: Option<NaiveDate>,
    pub long_short_ratio: Option<f64>,
    pub gross_exposure: Option<f64>,
    pub net_exposure: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl TryFrom<&BacktestRunRecord> for RunSummary {
    type Error = serde_json::Error;

    fn try_from(record: &BacktestRunRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            name: record.name.clone(),
            description: record.description.clone(),
            status: record.status.clone(),
            tickers: serde_json::from_str(&record.tickers)?,
            start_date: record.start_date,
            end_date: record.end_date,
            initial_capital: record.initial_capital,
            final_portfolio_value: record.final_portfolio_value,
            total_return_pct: record.total_return_pct,
            sharpe_ratio: record.sharpe_ratio,
            sortino_ratio: record.sortino_ratio,
            max_drawdown: record.max_drawdown,
            max_drawdown_date: record.max_drawdown_date,
            long_short_ratio: record.long_short_ratio,
            gross_exposure: record.gross_exposure,
            net_exposure: record.net_exposure,
            created_at: record.created_at,
            started_at: record.started_at,
            completed_at: record.completed_at,
            error_message: record.error_message.clone(),
        })
    }
}

/// Full run record (detail endpoint), summary fields plus configuration
/// blobs and, when requested, the daily time series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDetail {
    #[serde(flatten)]
    pub summary: RunSummary,
    pub graph_config: Option<Value>,
    pub agent_models: Option<Value>,
    pub request_data: Option<Value>,
    pub final_portfolio: Option<Value>,
    pub daily_results: Option<Vec<DailyResult>>,
}

impl RunDetail {
    pub fn from_record(
        record: &BacktestRunRecord,
        daily_results: Option<Vec<DailyResult>>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            summary: RunSummary::try_from(record)?,
            graph_config: parse_json_column(record.graph_config.as_deref())?,
            agent_models: parse_json_column(record.agent_models.as_deref())?,
            request_data: parse_json_column(record.request_data.as_deref())?,
            final_portfolio: parse_json_column(record.final_portfolio.as_deref())?,
            daily_results,
        })
    }
}

/// One trading day of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyResult {
    pub id: i64,
    pub backtest_run_id: i64,
    pub date: NaiveDate,
    pub portfolio_value: f64,
    pub cash: f64,
    pub decisions: Option<Value>,
    pub executed_trades: Option<Value>,
    pub analyst_signals: Option<Value>,
    pub current_prices: Option<Value>,
    pub long_exposure: Option<f64>,
    pub short_exposure: Option<f64>,
    pub gross_exposure: Option<f64>,
    pub net_exposure: Option<f64>,
    pub long_short_ratio: Option<f64>,
    pub portfolio_return_pct: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&BacktestDailyResultRecord> for DailyResult {
    type Error = serde_json::Error;

    fn try_from(record: &BacktestDailyResultRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            backtest_run_id: record.backtest_run_id,
            date: record.date,
            portfolio_value: record.portfolio_value,
            cash: record.cash,
            decisions: parse_json_column(record.decisions.as_deref())?,
            executed_trades: parse_json_column(record.executed_trades.as_deref())?,
            analyst_signals: parse_json_column(record.analyst_signals.as_deref())?,
            current_prices: parse_json_column(record.current_prices.as_deref())?,
            long_exposure: record.long_exposure,
            short_exposure: record.short_exposure,
            gross_exposure: record.gross_exposure,
            net_exposure: record.net_exposure,
            long_short_ratio: record.long_short_ratio,
            portfolio_return_pct: record.portfolio_return_pct,
            created_at: record.created_at,
        })
    }
}

/// Paginated list of run summaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunsListResponse {
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
    pub runs: Vec<RunSummary>,
}

/// Confirmation for a completed delete
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// Error body for 4xx/5xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}
