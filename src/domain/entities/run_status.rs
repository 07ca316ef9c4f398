//! Backtest run lifecycle status

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a backtest run.
///
/// A run is created IDLE or IN_PROGRESS by the execution process and
/// transitions to exactly one terminal state: COMPLETE (summary metrics
/// populated) or ERROR (error message populated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Idle,
    InProgress,
    Complete,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "IDLE",
            RunStatus::InProgress => "IN_PROGRESS",
            RunStatus::Complete => "COMPLETE",
            RunStatus::Error => "ERROR",
        }
    }

    /// COMPLETE and ERROR are terminal; no further transitions happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Error)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDLE" => Ok(RunStatus::Idle),
            "IN_PROGRESS" => Ok(RunStatus::InProgress),
            "COMPLETE" => Ok(RunStatus::Complete),
            "ERROR" => Ok(RunStatus::Error),
            other => Err(format!(
                "Invalid status '{}' (expected IDLE, IN_PROGRESS, COMPLETE or ERROR)",
                other
            )),
        }
    }
}
