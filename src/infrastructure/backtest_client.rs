//! Results API Client
//!
//! Typed HTTP client for the Results API, used by the history dashboard (and
//! any other consumer). Every request carries the timeout configured at
//! construction; an expired request surfaces as a transport error instead of
//! hanging the caller.

use reqwest::{Response, StatusCode};
use std::time::Duration;

use crate::application::schemas::{DailyResult, DeleteResponse, ErrorBody, RunDetail, RunsListResponse};

/// Client-side error taxonomy
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Unexpected status {status}: {detail}")]
    UnexpectedStatus { status: u16, detail: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Optional filters and pagination for the list endpoint
#[derive(Debug, Clone, Default)]
pub struct ListRunsParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
    pub ticker: Option<String>,
}

impl ListRunsParams {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(skip) = self.skip {
            query.push(("skip", skip.to_string()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(status) = &self.status {
            query.push(("status", status.clone()));
        }
        if let Some(ticker) = &self.ticker {
            query.push(("ticker", ticker.clone()));
        }
        query
    }
}

/// Results API client
#[derive(Debug, Clone)]
pub struct BacktestApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl BacktestApiClient {
    /// Create a client for `base_url` (e.g., "http://127.0.0.1:8000") with a
    /// per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `GET /backtests`
    pub async fn list_runs(&self, params: &ListRunsParams) -> Result<RunsListResponse, ClientError> {
        let response = self
            .http
            .get(format!("{}/backtests", self.base_url))
            .query(&params.to_query())
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// `GET /backtests/{id}`
    pub async fn get_run(
        &self,
        run_id: i64,
        include_daily_results: bool,
    ) -> Result<RunDetail, ClientError> {
        let response = self
            .http
            .get(format!("{}/backtests/{}", self.base_url, run_id))
            .query(&[("include_daily_results", include_daily_results.to_string())])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// `GET /backtests/{id}/daily`
    pub async fn daily_results(
        &self,
        run_id: i64,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<DailyResult>, ClientError> {
        let mut query = Vec::new();
        if let Some(start) = start_date {
            query.push(("start_date", start.to_string()));
        }
        if let Some(end) = end_date {
            query.push(("end_date", end.to_string()));
        }

        let response = self
            .http
            .get(format!("{}/backtests/{}/daily", self.base_url, run_id))
            .query(&query)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// `DELETE /backtests/{id}`
    pub async fn delete_run(&self, run_id: i64) -> Result<DeleteResponse, ClientError> {
        let response = self
            .http
            .delete(format!("{}/backtests/{}", self.base_url, run_id))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}

/// Map non-success statuses to the client error taxonomy, preserving the
/// server's `detail` message when the body carries one
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let detail = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.detail)
        .unwrap_or_else(|_| status.to_string());

    match status {
        StatusCode::NOT_FOUND => Err(ClientError::NotFound(detail)),
        StatusCode::BAD_REQUEST => Err(ClientError::InvalidRequest(detail)),
        s if s.is_server_error() => Err(ClientError::Server(detail)),
        s => Err(ClientError::UnexpectedStatus {
            status: s.as_u16(),
            detail,
        }),
    }
}
