//! History List View
//!
//! State machine for the run-history table: one loaded page of up to 100 run
//! summaries, four status filter tabs, and a two-step delete flow. Tab counts
//! reflect the currently loaded page, not the server-side total.

use crate::application::schemas::RunSummary;

/// Filter tabs shown above the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Complete,
    InProgress,
    Error,
}

impl StatusFilter {
    /// Status query parameter for the re-fetch this tab triggers
    pub fn as_query(&self) -> Option<&'static str> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Complete => Some("COMPLETE"),
            StatusFilter::InProgress => Some("IN_PROGRESS"),
            StatusFilter::Error => Some("ERROR"),
        }
    }

    fn matches(&self, status: &str) -> bool {
        match self.as_query() {
            None => true,
            Some(wanted) => status == wanted,
        }
    }
}

/// Direction of a run's total return, for coloring and the up/down/flat icon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnDirection {
    Up,
    Down,
    Flat,
}

/// One rendered table row
#[derive(Debug, Clone)]
pub struct RunRow {
    pub id: i64,
    pub display_name: String,
    pub tickers: Vec<String>,
    pub date_range: String,
    pub total_return_pct: Option<f64>,
    pub return_direction: ReturnDirection,
    pub sharpe_ratio: Option<f64>,
    pub max_drawdown: Option<f64>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl RunRow {
    fn from_summary(summary: &RunSummary) -> Self {
        let display_name = summary
            .name
            .clone()
            .unwrap_or_else(|| format!("Backtest #{}", summary.id));
        let return_direction = match summary.total_return_pct {
            Some(pct) if pct > 0.0 => ReturnDirection::Up,
            Some(pct) if pct < 0.0 => ReturnDirection::Down,
            _ => ReturnDirection::Flat,
        };
        Self {
            id: summary.id,
            display_name,
            tickers: summary.tickers.clone(),
            date_range: format!("{} to {}", summary.start_date, summary.end_date),
            total_return_pct: summary.total_return_pct,
            return_direction,
            sharpe_ratio: summary.sharpe_ratio,
            max_drawdown: summary.max_drawdown,
            status: summary.status.clone(),
            created_at: summary.created_at,
        }
    }
}

/// Per-tab row counts for the loaded page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TabCounts {
    pub all: usize,
    pub complete: usize,
    pub in_progress: usize,
    pub error: usize,
}

/// List view state
#[derive(Debug, Default)]
pub struct HistoryListView {
    runs: Vec<RunSummary>,
    filter: Option<StatusFilter>,
    pending_delete: Option<i64>,
    error_notice: Option<String>,
}

impl HistoryListView {
    pub fn new() -> Self {
        Self {
            runs: Vec::new(),
            filter: Some(StatusFilter::All),
            pending_delete: None,
            error_notice: None,
        }
    }

    pub fn active_filter(&self) -> StatusFilter {
        self.filter.unwrap_or(StatusFilter::All)
    }

    /// Switch tabs. Returns the status query to re-fetch with when the tab
    /// actually changed, None when it is already active.
    pub fn select_filter(&mut self, filter: StatusFilter) -> Option<Option<&'static str>> {
        if self.filter == Some(filter) {
            return None;
        }
        self.filter = Some(filter);
        Some(filter.as_query())
    }

    /// Commit a fetched page
    pub fn set_runs(&mut self, runs: Vec<RunSummary>) {
        self.runs = runs;
        self.pending_delete = None;
    }

    /// Counts shown on the tabs, computed from the loaded page only
    pub fn tab_counts(&self) -> TabCounts {
        let mut counts = TabCounts {
            all: self.runs.len(),
            ..Default::default()
        };
        for run in &self.runs {
            match run.status.as_str() {
                "COMPLETE" => counts.complete += 1,
                "IN_PROGRESS" => counts.in_progress += 1,
                "ERROR" => counts.error += 1,
                _ => {}
            }
        }
        counts
    }

    /// Rows for the active tab, in loaded (recency) order
    pub fn rows(&self) -> Vec<RunRow> {
        let filter = self.active_filter();
        self.runs
            .iter()
            .filter(|run| filter.matches(&run.status))
            .map(RunRow::from_summary)
            .collect()
    }

    /// First step of the delete flow: mark a row for confirmation
    pub fn request_delete(&mut self, run_id: i64) {
        if self.runs.iter().any(|run| run.id == run_id) {
            self.pending_delete = Some(run_id);
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Second step: take the confirmed id. The caller issues exactly one
    /// DELETE request for it and reports back via `delete_succeeded` /
    /// `delete_failed`.
    pub fn confirm_delete(&mut self) -> Option<i64> {
        self.pending_delete.take()
    }

    /// Remove the deleted row locally; no re-fetch needed
    pub fn delete_succeeded(&mut self, run_id: i64) {
        self.runs.retain(|run| run.id != run_id);
    }

    /// Keep the row and surface a notification
    pub fn delete_failed(&mut self, run_id: i64, message: impl Into<String>) {
        self.error_notice = Some(format!(
            "Failed to delete backtest {}: {}",
            run_id,
            message.into()
        ));
    }

    /// Pending toast, cleared on read
    pub fn take_error_notice(&mut self) -> Option<String> {
        self.error_notice.take()
    }
}
