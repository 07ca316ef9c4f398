//! Storage Contract
//!
//! The Results API and its tests depend on this trait rather than on a
//! concrete engine. SQLite is the shipped implementation
//! ([`super::repository::SqliteBacktestRepository`]); a networked relational
//! store is just another implementor, since the schema and API contract are
//! the compatibility surface, not the storage technology.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::models::{
    BacktestDailyResultRecord, BacktestRunRecord, CreateBacktestRun, CreateDailyResult,
    FinalizeBacktestRun, RunFilter,
};
use super::DatabaseError;

/// Read, write and delete access to backtest runs and daily results.
///
/// Write operations (`create_run`, `append_daily_result`, `finalize_run`) are
/// called by the backtest execution process; the HTTP API exposes only the
/// read and delete side.
#[async_trait]
pub trait BacktestStore: Send + Sync {
    /// Create a new run with status IN_PROGRESS and `started_at` set.
    async fn create_run(
        &self,
        input: CreateBacktestRun,
    ) -> Result<BacktestRunRecord, DatabaseError>;

    /// Append one simulated trading day. Fails on unknown run or duplicate
    /// (run, date).
    async fn append_daily_result(
        &self,
        run_id: i64,
        input: CreateDailyResult,
    ) -> Result<BacktestDailyResultRecord, DatabaseError>;

    /// Transition a run to its terminal state, populating summary metrics
    /// (COMPLETE) or the error message (ERROR).
    async fn finalize_run(
        &self,
        run_id: i64,
        outcome: FinalizeBacktestRun,
    ) -> Result<BacktestRunRecord, DatabaseError>;

    /// Fetch a run by id.
    async fn get_run(&self, run_id: i64) -> Result<Option<BacktestRunRecord>, DatabaseError>;

    /// Page of runs ordered by `created_at` descending (most recent first).
    async fn list_runs(
        &self,
        filter: &RunFilter,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<BacktestRunRecord>, DatabaseError>;

    /// Total runs matching the filter, ignoring pagination.
    async fn count_runs(&self, filter: &RunFilter) -> Result<i64, DatabaseError>;

    /// Daily results for a run ordered by date ascending, with optional
    /// inclusive bounds. Inverted bounds yield an empty vec.
    async fn daily_results(
        &self,
        run_id: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<BacktestDailyResultRecord>, DatabaseError>;

    /// Delete a run and all of its daily results atomically. Returns false
    /// if no run has that id.
    async fn delete_run(&self, run_id: i64) -> Result<bool, DatabaseError>;
}
