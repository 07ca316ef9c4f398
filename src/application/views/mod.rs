//! History View Models
//!
//! Presentation-agnostic state for the backtest history dashboard: the
//! paginated list of runs and the per-run detail with its derived chart
//! series. A rendering frontend drives these and draws whatever they expose.

pub mod history_list;
pub mod run_detail;
