//! Results API Handlers
//!
//! Read and delete access to backtest runs and daily results. Run data is
//! never created or mutated here; the execution process writes through the
//! repository directly.
//!
//! Routes:
//! - `GET /backtests` — paginated list with status/ticker filters
//! - `GET /backtests/:id` — full record, optionally with daily results
//! - `GET /backtests/:id/daily` — daily rows with inclusive date bounds
//! - `DELETE /backtests/:id` — cascade delete, all-or-nothing

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::error;

use crate::application::schemas::{
    DailyResult, DeleteResponse, ErrorBody, RunDetail, RunSummary, RunsListResponse,
};
use crate::domain::entities::run_status::RunStatus;
use crate::persistence::models::RunFilter;
use crate::persistence::store::BacktestStore;
use crate::persistence::DatabaseError;

/// Handlers are generic over the storage engine
pub type SharedStore = Arc<dyn BacktestStore>;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

/// API error taxonomy: 404 / 400 / 500 with `{ "detail": ... }` bodies
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Backtest run {0} not found")]
    NotFound(i64),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Internal(String),
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::RunNotFound(id) => ApiError::NotFound(id),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorBody {
            detail: self.to_string(),
        });
        (status, body).into_response()
    }
}

/// Build the Results API router
pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/backtests", get(list_backtest_runs))
        .route(
            "/backtests/:id",
            get(get_backtest_run).delete(delete_backtest_run),
        )
        .route("/backtests/:id/daily", get(get_backtest_daily_results))
        .route("/health", get(health_check))
        .with_state(store)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "running" }))
}

/// Query parameters for the list endpoint
#[derive(Debug, Deserialize)]
pub struct ListRunsQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub ticker: Option<String>,
}

/// Get a paginated list of backtest runs with optional filtering, most
/// recent first
async fn list_backtest_runs(
    State(store): State<SharedStore>,
    Query(params): Query<ListRunsQuery>,
) -> Result<Json<RunsListResponse>, ApiError> {
    let skip = params.skip.unwrap_or(0);
    if skip < 0 {
        return Err(ApiError::Validation(format!(
            "skip must be non-negative, got {}",
            skip
        )));
    }

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 1 {
        return Err(ApiError::Validation(format!(
            "limit must be at least 1, got {}",
            limit
        )));
    }
    let limit = limit.min(MAX_LIMIT);

    let status = params
        .status
        .as_deref()
        .map(RunStatus::from_str)
        .transpose()
        .map_err(ApiError::Validation)?;

    let filter = RunFilter {
        status,
        ticker: params.ticker.clone(),
    };

    let records = store.list_runs(&filter, skip, limit).await?;
    let total = store.count_runs(&filter).await?;

    let runs = records
        .iter()
        .map(RunSummary::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Internal(format!("Corrupt run record: {}", e)))?;

    Ok(Json(RunsListResponse {
        total,
        skip,
        limit,
        runs,
    }))
}

/// Query parameters for the detail endpoint
#[derive(Debug, Deserialize)]
pub struct RunDetailQuery {
    pub include_daily_results: Option<bool>,
}

/// Get detailed information about a specific backtest run
async fn get_backtest_run(
    State(store): State<SharedStore>,
    Path(run_id): Path<i64>,
    Query(params): Query<RunDetailQuery>,
) -> Result<Json<RunDetail>, ApiError> {
    let record = store
        .get_run(run_id)
        .await?
        .ok_or(ApiError::NotFound(run_id))?;

    let daily_results = if params.include_daily_results.unwrap_or(true) {
        let rows = store.daily_results(run_id, None, None).await?;
        let rows = rows
            .iter()
            .map(DailyResult::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::Internal(format!("Corrupt daily result record: {}", e)))?;
        Some(rows)
    } else {
        None
    };

    let detail = RunDetail::from_record(&record, daily_results)
        .map_err(|e| ApiError::Internal(format!("Corrupt run record: {}", e)))?;

    Ok(Json(detail))
}

/// Query parameters for the daily results endpoint
#[derive(Debug, Deserialize)]
pub struct DailyResultsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        ApiError::Validation(format!("Invalid {} format '{}'. Use YYYY-MM-DD", field, raw))
    })
}

/// Get daily results for a backtest run with optional inclusive date bounds.
///
/// Inverted bounds (start after end) return an empty list, not an error;
/// callers are expected to validate ordering themselves.
async fn get_backtest_daily_results(
    State(store): State<SharedStore>,
    Path(run_id): Path<i64>,
    Query(params): Query<DailyResultsQuery>,
) -> Result<Json<Vec<DailyResult>>, ApiError> {
    if store.get_run(run_id).await?.is_none() {
        return Err(ApiError::NotFound(run_id));
    }

    let start_date = params
        .start_date
        .as_deref()
        .map(|raw| parse_date(raw, "start_date"))
        .transpose()?;
    let end_date = params
        .end_date
        .as_deref()
        .map(|raw| parse_date(raw, "end_date"))
        .transpose()?;

    let rows = store.daily_results(run_id, start_date, end_date).await?;
    let results = rows
        .iter()
        .map(DailyResult::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Internal(format!("Corrupt daily result record: {}", e)))?;

    Ok(Json(results))
}

/// Delete a backtest run and, atomically, all of its daily results
async fn delete_backtest_run(
    State(store): State<SharedStore>,
    Path(run_id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = store.delete_run(run_id).await?;
    if !deleted {
        return Err(ApiError::NotFound(run_id));
    }

    Ok(Json(DeleteResponse {
        message: format!("Backtest run {} deleted successfully", run_id),
    }))
}
