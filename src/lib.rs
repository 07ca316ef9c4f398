//! Fundtrace Backtest History Library
//!
//! Persistence, Results API, client and view models for browsing the runs
//! recorded by the backtest execution process.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;

#[cfg(test)]
mod tests;
