//! Database Models
//!
//! Persistent data structures for backtest runs and daily results. JSON blob
//! columns (tickers, decisions, graph config, ...) are stored as TEXT and kept
//! as raw strings here; the API schema layer parses them into structured
//! values.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::domain::entities::run_status::RunStatus;

/// Backtest run record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BacktestRunRecord {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: String, // "IDLE", "IN_PROGRESS", "COMPLETE" or "ERROR"
    pub tickers: String, // JSON array of ticker symbols
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
    pub graph_config: Option<String>,    // JSON string
    pub agent_models: Option<String>,    // JSON string
    pub request_data: Option<String>,    // JSON string
    pub final_portfolio: Option<String>, // JSON string
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Daily result record in database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BacktestDailyResultRecord {
    pub id: i64,
    pub backtest_run_id: i64,
    pub date: NaiveDate,
    pub portfolio_value: f64,
    pub cash: f64,
    pub decisions: Option<String>,       // JSON string keyed by ticker
    pub executed_trades: Option<String>, // JSON string keyed by ticker
    pub analyst_signals: Option<String>, // JSON string keyed by ticker
    pub current_prices: Option<String>,  // JSON string keyed by ticker
    pub long_exposure: Option<f64>,
    pub short_exposure: Option<f64>,
    pub gross_exposure: Option<f64>,
    pub net_exposure: Option<f64>,
    pub long_short_ratio: Option<f64>,
    pub portfolio_return_pct: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Create backtest run input
#[derive(Debug, Clone, Default)]
pub struct CreateBacktestRun {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub graph_config: Option<serde_json::Value>,
    pub agent_models: Option<serde_json::Value>,
    pub request_data: Option<serde_json::Value>,
}

/// Finalize backtest run input
///
/// Summary metrics are populated on COMPLETE, error_message on ERROR.
#[derive(Debug, Clone)]
pub struct FinalizeBacktestRun {
    pub status: RunStatus,
    pub final_portfolio_value: Option<f64>,
    pub total_return_pct: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub max_drawdown_date: Option<NaiveDate>,
    pub long_short_ratio: Option<f64>,
    pub gross_exposure: Option<f64>,
    pub net_exposure: Option<f64>,
    pub final_portfolio: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

impl FinalizeBacktestRun {
    /// Terminal ERROR outcome carrying only the failure message
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Error,
            final_portfolio_value: None,
            total_return_pct: None,
            sharpe_ratio: None,
            sortino_ratio: None,
            max_drawdown: None,
            max_drawdown_date: None,
            long_short_ratio: None,
            gross_exposure: None,
            net_exposure: None,
            final_portfolio: None,
            error_message: Some(message.into()),
        }
    }
}

/// Append daily result input
#[derive(Debug, Clone, Default)]
pub struct CreateDailyResult {
    pub date: NaiveDate,
    pub portfolio_value: f64,
    pub cash: f64,
    pub decisions: Option<serde_json::Value>,
    pub executed_trades: Option<serde_json::Value>,
    pub analyst_signals: Option<serde_json::Value>,
    pub current_prices: Option<serde_json::Value>,
    pub long_exposure: Option<f64>,
    pub short_exposure: Option<f64>,
    pub gross_exposure: Option<f64>,
    pub net_exposure: Option<f64>,
    pub long_short_ratio: Option<f64>,
    pub portfolio_return_pct: Option<f64>,
}

/// Filter for listing and counting runs
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    pub status: Option<RunStatus>,
    pub ticker: Option<String>,
}
