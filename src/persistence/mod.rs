//! Persistence Layer
//!
//! This module provides database persistence for backtest runs and their
//! per-day results. Uses SQLite for local storage with async operations via
//! sqlx. The storage engine sits behind the [`store::BacktestStore`] trait so
//! the API surface never depends on the concrete engine.
//!
//! # Database Schema
//!
//! ## Backtest Runs Table
//! - id: Autoincrement integer
//! - name, description: Optional metadata
//! - status: "IDLE", "IN_PROGRESS", "COMPLETE" or "ERROR"
//! - tickers: JSON array of ticker symbols
//! - start_date, end_date: Calendar dates of the simulated range
//! - initial_capital: Starting cash
//! - Summary metrics (nullable until the run completes): final value,
//!   return %, sharpe, sortino, max drawdown (+ date), long/short ratio,
//!   gross/net exposure
//! - graph_config, agent_models, request_data, final_portfolio: JSON blobs
//! - error_message: Populated only on ERROR
//! - created_at, started_at, completed_at: Lifecycle timestamps
//!
//! ## Backtest Daily Results Table
//! - id: Autoincrement integer
//! - backtest_run_id: Foreign key to backtest_runs, cascade on delete
//! - date: Trading day, unique per run
//! - portfolio_value, cash: Portfolio state at close
//! - decisions, executed_trades, analyst_signals, current_prices: JSON blobs
//!   keyed by ticker
//! - Exposure metrics and cumulative return (nullable)
//! - created_at: Timestamp

pub mod models;
pub mod repository;
pub mod store;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Database connection pool
pub type DbPool = SqlitePool;

/// Database initialization error
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Backtest run {0} not found")]
    RunNotFound(i64),
}

/// Initialize the database connection pool
///
/// # Arguments
/// - `database_url`: Path to SQLite database file (e.g., "sqlite://data/fundtrace.db")
///
/// # Returns
/// Database connection pool ready for use
///
/// # Errors
/// Returns error if database connection fails or migrations fail
pub async fn init_database(database_url: &str) -> Result<DbPool, DatabaseError> {
    info!("Initializing database: {}", database_url);

    // Ensure data directory exists
    if let Some(db_path) = database_url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::ConnectionError(sqlx::Error::Configuration(Box::new(e)))
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .log_statements(tracing::log::LevelFilter::Debug);

    // An in-memory database exists per connection, so the pool must not hand
    // out a second connection that never saw the migrations.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");

    Ok(pool)
}

/// Run database migrations
async fn run_migrations(pool: &DbPool) -> Result<(), DatabaseError> {
    info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS backtest_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'IDLE'
                CHECK(status IN ('IDLE', 'IN_PROGRESS', 'COMPLETE', 'ERROR')),
            tickers TEXT NOT NULL,
            start_date DATE NOT NULL,
            end_date DATE NOT NULL,
            initial_capital REAL NOT NULL,
            final_portfolio_value REAL,
            total_return_pct REAL,
            sharpe_ratio REAL,
            sortino_ratio REAL,
            max_drawdown REAL,
            max_drawdown_date DATE,
            long_short_ratio REAL,
            gross_exposure REAL,
            net_exposure REAL,
            graph_config TEXT,
            agent_models TEXT,
            request_data TEXT,
            final_portfolio TEXT,
            error_message TEXT,
            created_at DATETIME NOT NULL,
            started_at DATETIME,
            completed_at DATETIME
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!("Failed to create backtest_runs table: {}", e))
    })?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS backtest_daily_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            backtest_run_id INTEGER NOT NULL
                REFERENCES backtest_runs(id) ON DELETE CASCADE,
            date DATE NOT NULL,
            portfolio_value REAL NOT NULL,
            cash REAL NOT NULL,
            decisions TEXT,
            executed_trades TEXT,
            analyst_signals TEXT,
            current_prices TEXT,
            long_exposure REAL,
            short_exposure REAL,
            gross_exposure REAL,
            net_exposure REAL,
            long_short_ratio REAL,
            portfolio_return_pct REAL,
            created_at DATETIME NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::MigrationError(format!(
            "Failed to create backtest_daily_results table: {}",
            e
        ))
    })?;

    // Indexes for better query performance
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_runs_status_created ON backtest_runs(status, created_at)",
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_runs_date_range ON backtest_runs(start_date, end_date)",
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_daily_run_date
        ON backtest_daily_results(backtest_run_id, date)
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    info!("Database migrations completed successfully");

    Ok(())
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL (e.g., "sqlite://data/fundtrace.db")
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Enable query logging
    pub log_queries: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://data/fundtrace.db".to_string(),
            max_connections: 5,
            log_queries: cfg!(debug_assertions),
        }
    }
}

impl DatabaseConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/fundtrace.db".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let log_queries = std::env::var("DATABASE_LOG_QUERIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(cfg!(debug_assertions));

        Self {
            url,
            max_connections,
            log_queries,
        }
    }
}
