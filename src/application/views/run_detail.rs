//! Run Detail View
//!
//! State machine for one run's detail page: Overview, Performance charts,
//! Daily Trades table and Configuration text. The fetch is keyed to the
//! selected run id with a generation token so a stale in-flight response for
//! a previously selected run never overwrites the view.

use chrono::NaiveDate;
use serde_json::Value;

use crate::application::schemas::{DailyResult, RunDetail};

/// Lifecycle of the detail fetch
#[derive(Debug)]
pub enum DetailState {
    Loading,
    Loaded(Box<RunDetail>),
    NotFound,
    Failed(String),
}

/// One point of a date-keyed chart series
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One point of the stacked long/short exposure chart
#[derive(Debug, Clone, PartialEq)]
pub struct ExposurePoint {
    pub date: NaiveDate,
    pub long: f64,
    pub short: f64,
}

/// Detail view state for the currently selected run
#[derive(Debug)]
pub struct RunDetailView {
    run_id: i64,
    generation: u64,
    state: DetailState,
}

impl RunDetailView {
    pub fn new(run_id: i64) -> Self {
        Self {
            run_id,
            generation: 0,
            state: DetailState::Loading,
        }
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    /// Start a fetch for `run_id`, invalidating any in-flight request. The
    /// returned token must be passed back to [`Self::resolve`].
    pub fn begin_fetch(&mut self, run_id: i64) -> u64 {
        self.run_id = run_id;
        self.generation += 1;
        self.state = DetailState::Loading;
        self.generation
    }

    /// Commit a fetch result. A resolution carrying a stale token is
    /// discarded: the user has navigated on since that request was issued.
    pub fn resolve(&mut self, token: u64, result: FetchResult) -> bool {
        if token != self.generation {
            return false;
        }
        self.state = match result {
            FetchResult::Found(detail) => DetailState::Loaded(Box::new(detail)),
            FetchResult::NotFound => DetailState::NotFound,
            FetchResult::Failed(message) => DetailState::Failed(message),
        };
        true
    }

    fn daily_results(&self) -> &[DailyResult] {
        match &self.state {
            DetailState::Loaded(detail) => detail.daily_results.as_deref().unwrap_or(&[]),
            _ => &[],
        }
    }

    /// Portfolio value over time
    pub fn portfolio_value_series(&self) -> Vec<SeriesPoint> {
        self.daily_results()
            .iter()
            .map(|day| SeriesPoint {
                date: day.date,
                value: day.portfolio_value,
            })
            .collect()
    }

    /// Cumulative return percentage over time; days without a recorded
    /// return are skipped
    pub fn cumulative_return_series(&self) -> Vec<SeriesPoint> {
        self.daily_results()
            .iter()
            .filter_map(|day| {
                day.portfolio_return_pct.map(|value| SeriesPoint {
                    date: day.date,
                    value,
                })
            })
            .collect()
    }

    /// Stacked long/short exposure over time; missing values plot as zero
    pub fn exposure_series(&self) -> Vec<ExposurePoint> {
        self.daily_results()
            .iter()
            .map(|day| ExposurePoint {
                date: day.date,
                long: day.long_exposure.unwrap_or(0.0),
                short: day.short_exposure.unwrap_or(0.0),
            })
            .collect()
    }

    /// Daily Trades rows: date paired with its human-readable trade summary
    pub fn daily_trade_rows(&self) -> Vec<(NaiveDate, String)> {
        self.daily_results()
            .iter()
            .map(|day| (day.date, trade_summary(day.executed_trades.as_ref())))
            .collect()
    }

    /// Raw graph configuration, pretty-printed
    pub fn graph_config_text(&self) -> Option<String> {
        match &self.state {
            DetailState::Loaded(detail) => detail.graph_config.as_ref().map(pretty_json),
            _ => None,
        }
    }

    /// Agent model configuration, pretty-printed
    pub fn agent_models_text(&self) -> Option<String> {
        match &self.state {
            DetailState::Loaded(detail) => detail.agent_models.as_ref().map(pretty_json),
            _ => None,
        }
    }

    /// Error message block, shown only when the run failed
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            DetailState::Loaded(detail) => detail.summary.error_message.as_deref(),
            _ => None,
        }
    }
}

fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Outcome of a detail fetch, as reported by the caller
#[derive(Debug)]
pub enum FetchResult {
    Found(RunDetail),
    NotFound,
    Failed(String),
}

/// Build the per-day trade summary by joining non-zero executed-trade
/// quantities per ticker as "TICKER: qty".
///
/// The blob shape is owned by the orchestration subsystem, so both a bare
/// number and an object carrying a "quantity" field are accepted.
pub fn trade_summary(executed_trades: Option<&Value>) -> String {
    let Some(Value::Object(trades)) = executed_trades else {
        return "No trades".to_string();
    };

    let mut entries: Vec<(String, f64)> = trades
        .iter()
        .filter_map(|(ticker, entry)| {
            let quantity = match entry {
                Value::Object(fields) => fields.get("quantity").and_then(Value::as_f64),
                other => other.as_f64(),
            }?;
            if quantity == 0.0 {
                return None;
            }
            Some((ticker.clone(), quantity))
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    if entries.is_empty() {
        return "No trades".to_string();
    }

    entries
        .iter()
        .map(|(ticker, quantity)| format!("{}: {}", ticker, quantity))
        .collect::<Vec<_>>()
        .join(", ")
}
