// Integration tests for the history dashboard workflow: repository write
// side, Results API, and the view models driven against real responses.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use serde_json::json;
use tower::ServiceExt;

use crate::application::handlers::{router, SharedStore};
use crate::application::schemas::{RunDetail, RunsListResponse};
use crate::application::views::history_list::{HistoryListView, StatusFilter};
use crate::application::views::run_detail::{DetailState, FetchResult, RunDetailView};
use crate::domain::entities::run_status::RunStatus;
use crate::persistence::init_database;
use crate::persistence::models::{CreateBacktestRun, CreateDailyResult, FinalizeBacktestRun};
use crate::persistence::repository::SqliteBacktestRepository;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

async fn test_store() -> SharedStore {
    let pool = init_database("sqlite::memory:").await.unwrap();
    Arc::new(SqliteBacktestRepository::new(pool))
}

async fn get(router: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    send(router, "GET", uri).await
}

async fn send(router: &axum::Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

/// Seed one completed AAPL run with two trading days and one failed TSLA run
async fn seed(store: &SharedStore) -> (i64, i64) {
    let complete = store
        .create_run(CreateBacktestRun {
            tickers: vec!["AAPL".to_string()],
            start_date: date("2023-01-03"),
            end_date: date("2023-01-04"),
            initial_capital: 100_000.0,
            graph_config: Some(json!({"nodes": [], "edges": []})),
            ..Default::default()
        })
        .await
        .unwrap();

    for (day, value, cash) in [
        ("2023-01-03", 100_500.0, 90_000.0),
        ("2023-01-04", 101_000.0, 89_500.0),
    ] {
        store
            .append_daily_result(
                complete.id,
                CreateDailyResult {
                    date: date(day),
                    portfolio_value: value,
                    cash,
                    executed_trades: Some(json!({"AAPL": {"action": "buy", "quantity": 10.0}})),
                    long_exposure: Some(10_500.0),
                    short_exposure: Some(0.0),
                    portfolio_return_pct: Some((value / 100_000.0 - 1.0) * 100.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    store
        .finalize_run(
            complete.id,
            FinalizeBacktestRun {
                status: RunStatus::Complete,
                final_portfolio_value: Some(101_000.0),
                total_return_pct: Some(1.0),
                sharpe_ratio: Some(1.2),
                sortino_ratio: Some(1.4),
                max_drawdown: Some(-0.2),
                max_drawdown_date: Some(date("2023-01-03")),
                long_short_ratio: Some(10.0),
                gross_exposure: Some(10_500.0),
                net_exposure: Some(10_500.0),
                final_portfolio: Some(json!({"cash": 89_500.0})),
                error_message: None,
            },
        )
        .await
        .unwrap();

    let failed = store
        .create_run(CreateBacktestRun {
            tickers: vec!["TSLA".to_string()],
            start_date: date("2023-01-03"),
            end_date: date("2023-01-04"),
            initial_capital: 50_000.0,
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .finalize_run(failed.id, FinalizeBacktestRun::error("price feed unavailable"))
        .await
        .unwrap();

    (complete.id, failed.id)
}

#[tokio::test]
async fn test_list_view_workflow() {
    let store = test_store().await;
    let (complete_id, failed_id) = seed(&store).await;
    let app = router(store);

    // Initial load: all runs, most recent first
    let (status, body) = get(&app, "/backtests?limit=100").await;
    assert_eq!(status, StatusCode::OK);
    let list: RunsListResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(list.total, 2);
    assert_eq!(list.runs[0].id, failed_id);
    assert_eq!(list.runs[1].id, complete_id);

    let mut view = HistoryListView::new();
    view.set_runs(list.runs);

    let counts = view.tab_counts();
    assert_eq!(counts.all, 2);
    assert_eq!(counts.complete, 1);
    assert_eq!(counts.error, 1);
    assert_eq!(counts.in_progress, 0);

    // Switching to the Complete tab yields the query for the re-fetch
    let query = view.select_filter(StatusFilter::Complete).unwrap();
    assert_eq!(query, Some("COMPLETE"));
    let (status, body) = get(&app, "/backtests?status=COMPLETE").await;
    assert_eq!(status, StatusCode::OK);
    let list: RunsListResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(list.total, 1);
    assert_eq!(list.runs[0].id, complete_id);
    assert_eq!(list.runs[0].total_return_pct, Some(1.0));

    view.set_runs(list.runs);

    // Delete flow: confirm, issue exactly the delete request, drop the row
    // locally without re-fetching
    view.request_delete(complete_id);
    let confirmed = view.confirm_delete().unwrap();
    assert_eq!(confirmed, complete_id);
    let (status, _) = send(&app, "DELETE", &format!("/backtests/{}", confirmed)).await;
    assert_eq!(status, StatusCode::OK);
    view.delete_succeeded(confirmed);
    assert!(view.rows().is_empty());

    // The run is gone server-side as well
    let (status, _) = get(&app, &format!("/backtests/{}", complete_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_detail_view_workflow() {
    let store = test_store().await;
    let (complete_id, failed_id) = seed(&store).await;
    let app = router(store);

    let mut view = RunDetailView::new(complete_id);
    let token = view.begin_fetch(complete_id);
    let (status, body) = get(&app, &format!("/backtests/{}", complete_id)).await;
    assert_eq!(status, StatusCode::OK);
    let detail: RunDetail = serde_json::from_slice(&body).unwrap();
    assert!(view.resolve(token, FetchResult::Found(detail)));

    // Performance charts cover both trading days in order
    let values = view.portfolio_value_series();
    assert_eq!(values.len(), 2);
    assert_eq!(values[0].date, date("2023-01-03"));
    assert_eq!(values[0].value, 100_500.0);
    assert_eq!(values[1].value, 101_000.0);

    let returns = view.cumulative_return_series();
    assert_eq!(returns.len(), 2);
    assert!(returns[1].value > returns[0].value);

    // Daily Trades table
    let rows = view.daily_trade_rows();
    assert_eq!(rows[0].1, "AAPL: 10");

    // Configuration tab
    assert!(view.graph_config_text().unwrap().contains("\"nodes\""));
    assert!(view.error_message().is_none());

    // The failed run surfaces its error block
    let token = view.begin_fetch(failed_id);
    let (_, body) = get(&app, &format!("/backtests/{}", failed_id)).await;
    let detail: RunDetail = serde_json::from_slice(&body).unwrap();
    view.resolve(token, FetchResult::Found(detail));
    assert_eq!(view.error_message(), Some("price feed unavailable"));

    // A missing run renders the not-found state
    let token = view.begin_fetch(999);
    let (status, _) = get(&app, "/backtests/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    view.resolve(token, FetchResult::NotFound);
    assert!(matches!(view.state(), DetailState::NotFound));
}
