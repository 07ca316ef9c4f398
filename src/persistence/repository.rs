//! Database Repository
//!
//! SQLite-backed implementation of [`BacktestStore`]: data access for
//! backtest runs and their daily results.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::models::*;
use super::store::BacktestStore;
use super::{DatabaseError, DbPool};
use crate::domain::entities::run_status::RunStatus;
use tracing::{debug, error};

/// Serialize an optional JSON blob for a TEXT column
fn to_json_text(value: &Option<serde_json::Value>) -> Result<Option<String>, DatabaseError> {
    value
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| DatabaseError::QueryError(format!("Failed to serialize JSON column: {}", e)))
}

/// Backtest repository
#[derive(Clone)]
pub struct SqliteBacktestRepository {
    pool: DbPool,
}

impl SqliteBacktestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BacktestStore for SqliteBacktestRepository {
    async fn create_run(
        &self,
        input: CreateBacktestRun,
    ) -> Result<BacktestRunRecord, DatabaseError> {
        let now = Utc::now();
        let tickers = serde_json::to_string(&input.tickers).map_err(|e| {
            DatabaseError::QueryError(format!("Failed to serialize tickers: {}", e))
        })?;
        let graph_config = to_json_text(&input.graph_config)?;
        let agent_models = to_json_text(&input.agent_models)?;
        let request_data = to_json_text(&input.request_data)?;

        let record = sqlx::query_as::<_, BacktestRunRecord>(
            r#"
            INSERT INTO backtest_runs (
                name, description, status, tickers, start_date, end_date,
                initial_capital, graph_config, agent_models, request_data,
                created_at, started_at
            )
            VALUES (?1, ?2, 'IN_PROGRESS', ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.description)
        .bind(&tickers)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.initial_capital)
        .bind(&graph_config)
        .bind(&agent_models)
        .bind(&request_data)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create backtest run: {}", e);
            DatabaseError::QueryError(format!("Failed to create backtest run: {}", e))
        })?;

        debug!("Created backtest run {} ({})", record.id, record.tickers);
        Ok(record)
    }

    async fn append_daily_result(
        &self,
        run_id: i64,
        input: CreateDailyResult,
    ) -> Result<BacktestDailyResultRecord, DatabaseError> {
        let exists: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM backtest_runs WHERE id = ?1")
                .bind(run_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    error!("Failed to look up backtest run {}: {}", run_id, e);
                    DatabaseError::QueryError(format!("Failed to look up backtest run: {}", e))
                })?;
        if exists.is_none() {
            return Err(DatabaseError::RunNotFound(run_id));
        }

        let now = Utc::now();
        let decisions = to_json_text(&input.decisions)?;
        let executed_trades = to_json_text(&input.executed_trades)?;
        let analyst_signals = to_json_text(&input.analyst_signals)?;
        let current_prices = to_json_text(&input.current_prices)?;

        let record = sqlx::query_as::<_, BacktestDailyResultRecord>(
            r#"
            INSERT INTO backtest_daily_results (
                backtest_run_id, date, portfolio_value, cash,
                decisions, executed_trades, analyst_signals, current_prices,
                long_exposure, short_exposure, gross_exposure, net_exposure,
                long_short_ratio, portfolio_return_pct, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            RETURNING *
            "#,
        )
        .bind(run_id)
        .bind(input.date)
        .bind(input.portfolio_value)
        .bind(input.cash)
        .bind(&decisions)
        .bind(&executed_trades)
        .bind(&analyst_signals)
        .bind(&current_prices)
        .bind(input.long_exposure)
        .bind(input.short_exposure)
        .bind(input.gross_exposure)
        .bind(input.net_exposure)
        .bind(input.long_short_ratio)
        .bind(input.portfolio_return_pct)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to append daily result for run {}: {}", run_id, e);
            DatabaseError::QueryError(format!("Failed to append daily result: {}", e))
        })?;

        debug!("Appended daily result for run {} on {}", run_id, record.date);
        Ok(record)
    }

    async fn finalize_run(
        &self,
        run_id: i64,
        outcome: FinalizeBacktestRun,
    ) -> Result<BacktestRunRecord, DatabaseError> {
        let completed_at = if outcome.status == RunStatus::Complete {
            Some(Utc::now())
        } else {
            None
        };
        let final_portfolio = to_json_text(&outcome.final_portfolio)?;

        let record = sqlx::query_as::<_, BacktestRunRecord>(
            r#"
            UPDATE backtest_runs
            SET status = ?1,
                final_portfolio_value = ?2,
                total_return_pct = ?3,
                sharpe_ratio = ?4,
                sortino_ratio = ?5,
                max_drawdown = ?6,
                max_drawdown_date = ?7,
                long_short_ratio = ?8,
                gross_exposure = ?9,
                net_exposure = ?10,
                final_portfolio = ?11,
                error_message = ?12,
                completed_at = COALESCE(?13, completed_at)
            WHERE id = ?14
            RETURNING *
            "#,
        )
        .bind(outcome.status.as_str())
        .bind(outcome.final_portfolio_value)
        .bind(outcome.total_return_pct)
        .bind(outcome.sharpe_ratio)
        .bind(outcome.sortino_ratio)
        .bind(outcome.max_drawdown)
        .bind(outcome.max_drawdown_date)
        .bind(outcome.long_short_ratio)
        .bind(outcome.gross_exposure)
        .bind(outcome.net_exposure)
        .bind(&final_portfolio)
        .bind(&outcome.error_message)
        .bind(completed_at)
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to finalize backtest run {}: {}", run_id, e);
            DatabaseError::QueryError(format!("Failed to finalize backtest run: {}", e))
        })?
        .ok_or(DatabaseError::RunNotFound(run_id))?;

        debug!("Finalized backtest run {} as {}", run_id, record.status);
        Ok(record)
    }

    async fn get_run(&self, run_id: i64) -> Result<Option<BacktestRunRecord>, DatabaseError> {
        let record =
            sqlx::query_as::<_, BacktestRunRecord>("SELECT * FROM backtest_runs WHERE id = ?1")
                .bind(run_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    error!("Failed to get backtest run {}: {}", run_id, e);
                    DatabaseError::QueryError(format!("Failed to get backtest run: {}", e))
                })?;

        Ok(record)
    }

    async fn list_runs(
        &self,
        filter: &RunFilter,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<BacktestRunRecord>, DatabaseError> {
        let mut qb =
            sqlx::QueryBuilder::<sqlx::Sqlite>::new("SELECT * FROM backtest_runs WHERE 1 = 1");
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(skip);

        let records = qb
            .build_query_as::<BacktestRunRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to list backtest runs: {}", e);
                DatabaseError::QueryError(format!("Failed to list backtest runs: {}", e))
            })?;

        Ok(records)
    }

    async fn count_runs(&self, filter: &RunFilter) -> Result<i64, DatabaseError> {
        let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "SELECT COUNT(*) FROM backtest_runs WHERE 1 = 1",
        );
        push_filter(&mut qb, filter);

        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to count backtest runs: {}", e);
                DatabaseError::QueryError(format!("Failed to count backtest runs: {}", e))
            })?;

        Ok(count)
    }

    async fn daily_results(
        &self,
        run_id: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<BacktestDailyResultRecord>, DatabaseError> {
        let mut qb = sqlx::QueryBuilder::<sqlx::Sqlite>::new(
            "SELECT * FROM backtest_daily_results WHERE backtest_run_id = ",
        );
        qb.push_bind(run_id);
        if let Some(start) = start_date {
            qb.push(" AND date >= ").push_bind(start);
        }
        if let Some(end) = end_date {
            qb.push(" AND date <= ").push_bind(end);
        }
        qb.push(" ORDER BY date ASC");

        let records = qb
            .build_query_as::<BacktestDailyResultRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to get daily results for run {}: {}", run_id, e);
                DatabaseError::QueryError(format!("Failed to get daily results: {}", e))
            })?;

        Ok(records)
    }

    async fn delete_run(&self, run_id: i64) -> Result<bool, DatabaseError> {
        // Transactional so a failed cascade leaves no partial deletion and a
        // concurrent append for the same run serializes against the delete.
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin delete transaction: {}", e);
            DatabaseError::QueryError(format!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query("DELETE FROM backtest_daily_results WHERE backtest_run_id = ?1")
            .bind(run_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to delete daily results for run {}: {}", run_id, e);
                DatabaseError::QueryError(format!("Failed to delete daily results: {}", e))
            })?;

        let rows_affected = sqlx::query("DELETE FROM backtest_runs WHERE id = ?1")
            .bind(run_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to delete backtest run {}: {}", run_id, e);
                DatabaseError::QueryError(format!("Failed to delete backtest run: {}", e))
            })?
            .rows_affected();

        if rows_affected == 0 {
            tx.rollback().await.map_err(|e| {
                DatabaseError::QueryError(format!("Failed to roll back transaction: {}", e))
            })?;
            return Ok(false);
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit delete of run {}: {}", run_id, e);
            DatabaseError::QueryError(format!("Failed to commit transaction: {}", e))
        })?;

        debug!("Deleted backtest run {} and its daily results", run_id);
        Ok(true)
    }
}

/// Append status/ticker conditions shared by list and count
fn push_filter<'a>(qb: &mut sqlx::QueryBuilder<'a, sqlx::Sqlite>, filter: &'a RunFilter) {
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(ticker) = &filter.ticker {
        qb.push(" AND EXISTS (SELECT 1 FROM json_each(backtest_runs.tickers) WHERE json_each.value = ")
            .push_bind(ticker.as_str())
            .push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::init_database;
    use serde_json::json;

    async fn test_repo() -> SqliteBacktestRepository {
        let pool = init_database("sqlite::memory:").await.unwrap();
        SqliteBacktestRepository::new(pool)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_run(tickers: &[&str]) -> CreateBacktestRun {
        CreateBacktestRun {
            name: None,
            description: None,
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            start_date: date("2023-01-01"),
            end_date: date("2023-06-30"),
            initial_capital: 100_000.0,
            graph_config: Some(json!({"nodes": [], "edges": []})),
            agent_models: None,
            request_data: None,
        }
    }

    fn sample_day(day: &str, portfolio_value: f64, cash: f64) -> CreateDailyResult {
        CreateDailyResult {
            date: date(day),
            portfolio_value,
            cash,
            executed_trades: Some(json!({"AAPL": {"action": "buy", "quantity": 10.0}})),
            current_prices: Some(json!({"AAPL": 150.0})),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_run_lifecycle() {
        let repo = test_repo().await;

        let run = repo.create_run(sample_run(&["AAPL"])).await.unwrap();
        assert_eq!(run.status, "IN_PROGRESS");
        assert!(run.started_at.is_some());
        assert!(run.completed_at.is_none());
        assert!(run.total_return_pct.is_none());

        repo.append_daily_result(run.id, sample_day("2023-01-03", 100_500.0, 90_000.0))
            .await
            .unwrap();
        repo.append_daily_result(run.id, sample_day("2023-01-04", 101_000.0, 89_500.0))
            .await
            .unwrap();

        let finalized = repo
            .finalize_run(
                run.id,
                FinalizeBacktestRun {
                    status: RunStatus::Complete,
                    final_portfolio_value: Some(101_000.0),
                    total_return_pct: Some(1.0),
                    sharpe_ratio: Some(1.2),
                    sortino_ratio: Some(1.5),
                    max_drawdown: Some(-0.5),
                    max_drawdown_date: Some(date("2023-01-03")),
                    long_short_ratio: Some(2.0),
                    gross_exposure: Some(11_000.0),
                    net_exposure: Some(9_000.0),
                    final_portfolio: Some(json!({"cash": 89_500.0})),
                    error_message: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(finalized.status, "COMPLETE");
        assert_eq!(finalized.total_return_pct, Some(1.0));
        assert!(finalized.completed_at.is_some());
        assert!(finalized.error_message.is_none());
        assert!(finalized.created_at <= finalized.completed_at.unwrap());

        let daily = repo.daily_results(run.id, None, None).await.unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, date("2023-01-03"));
        assert_eq!(daily[1].date, date("2023-01-04"));
    }

    #[tokio::test]
    async fn test_finalize_error_sets_message_only() {
        let repo = test_repo().await;
        let run = repo.create_run(sample_run(&["TSLA"])).await.unwrap();

        let failed = repo
            .finalize_run(run.id, FinalizeBacktestRun::error("price feed unavailable"))
            .await
            .unwrap();
        assert_eq!(failed.status, "ERROR");
        assert_eq!(failed.error_message.as_deref(), Some("price feed unavailable"));
        assert!(failed.total_return_pct.is_none());
        assert!(failed.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_finalize_unknown_run() {
        let repo = test_repo().await;
        let result = repo
            .finalize_run(42, FinalizeBacktestRun::error("boom"))
            .await;
        assert!(matches!(result, Err(DatabaseError::RunNotFound(42))));
    }

    #[tokio::test]
    async fn test_append_rejects_unknown_run_and_duplicate_date() {
        let repo = test_repo().await;

        let missing = repo
            .append_daily_result(99, sample_day("2023-01-03", 1.0, 1.0))
            .await;
        assert!(matches!(missing, Err(DatabaseError::RunNotFound(99))));

        let run = repo.create_run(sample_run(&["AAPL"])).await.unwrap();
        repo.append_daily_result(run.id, sample_day("2023-01-03", 1.0, 1.0))
            .await
            .unwrap();
        let duplicate = repo
            .append_daily_result(run.id, sample_day("2023-01-03", 2.0, 2.0))
            .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_list_runs_recency_order_and_pagination() {
        let repo = test_repo().await;
        for _ in 0..3 {
            repo.create_run(sample_run(&["AAPL"])).await.unwrap();
        }

        let all = repo.list_runs(&RunFilter::default(), 0, 100).await.unwrap();
        assert_eq!(all.len(), 3);
        // Most recent first; ids break timestamp ties
        assert!(all[0].id > all[1].id && all[1].id > all[2].id);

        let page = repo.list_runs(&RunFilter::default(), 1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, all[1].id);

        let total = repo.count_runs(&RunFilter::default()).await.unwrap();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_list_runs_filters() {
        let repo = test_repo().await;
        let a = repo.create_run(sample_run(&["AAPL", "MSFT"])).await.unwrap();
        let b = repo.create_run(sample_run(&["TSLA"])).await.unwrap();
        repo.finalize_run(
            a.id,
            FinalizeBacktestRun {
                status: RunStatus::Complete,
                final_portfolio_value: Some(1.0),
                total_return_pct: Some(0.0),
                sharpe_ratio: Some(0.0),
                sortino_ratio: Some(0.0),
                max_drawdown: Some(0.0),
                max_drawdown_date: None,
                long_short_ratio: None,
                gross_exposure: Some(0.0),
                net_exposure: Some(0.0),
                final_portfolio: None,
                error_message: None,
            },
        )
        .await
        .unwrap();

        let complete = RunFilter {
            status: Some(RunStatus::Complete),
            ticker: None,
        };
        let runs = repo.list_runs(&complete, 0, 100).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, a.id);
        assert_eq!(repo.count_runs(&complete).await.unwrap(), 1);

        let by_ticker = RunFilter {
            status: None,
            ticker: Some("TSLA".to_string()),
        };
        let runs = repo.list_runs(&by_ticker, 0, 100).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].id, b.id);

        let no_match = RunFilter {
            status: None,
            ticker: Some("NVDA".to_string()),
        };
        assert_eq!(repo.count_runs(&no_match).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_daily_results_date_bounds() {
        let repo = test_repo().await;
        let run = repo.create_run(sample_run(&["AAPL"])).await.unwrap();
        for (day, value) in [
            ("2023-01-03", 100_500.0),
            ("2023-01-04", 101_000.0),
            ("2023-01-05", 100_750.0),
        ] {
            repo.append_daily_result(run.id, sample_day(day, value, 90_000.0))
                .await
                .unwrap();
        }

        // Inclusive bounds
        let bounded = repo
            .daily_results(run.id, Some(date("2023-01-04")), Some(date("2023-01-05")))
            .await
            .unwrap();
        assert_eq!(bounded.len(), 2);
        assert_eq!(bounded[0].date, date("2023-01-04"));

        // Inverted bounds return an empty sequence, not an error
        let inverted = repo
            .daily_results(run.id, Some(date("2023-06-01")), Some(date("2023-05-01")))
            .await
            .unwrap();
        assert!(inverted.is_empty());
    }

    #[tokio::test]
    async fn test_delete_run_cascades() {
        let repo = test_repo().await;
        let run = repo.create_run(sample_run(&["AAPL"])).await.unwrap();
        repo.append_daily_result(run.id, sample_day("2023-01-03", 1.0, 1.0))
            .await
            .unwrap();

        assert!(repo.delete_run(run.id).await.unwrap());
        assert!(repo.get_run(run.id).await.unwrap().is_none());
        assert!(repo.daily_results(run.id, None, None).await.unwrap().is_empty());

        // Second delete finds nothing
        assert!(!repo.delete_run(run.id).await.unwrap());
    }
}
