use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::budget::{BudgetSummary, TokenUsage};
use crate::response::Grades;

/// What a run does when a row's prep, completion or post-processing fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the run and return the error.
    #[default]
    Abort,
    /// Log the failure, record the row as skipped and continue.
    #[serde(alias = "skip")]
    SkipRow,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => f.write_str("abort"),
            FailurePolicy::SkipRow => f.write_str("skip_row"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" | "skip_row" => Ok(FailurePolicy::SkipRow),
            other => Err(format!(
                "unknown failure policy `{other}` (expected abort or skip_row)"
            )),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every row was attempted.
    Completed,
    /// Accumulated usage went over the capacity; remaining rows were not run.
    BudgetExceeded,
}

/// Progress notifications emitted during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    RowStarted {
        index: usize,
    },
    RowCompleted {
        index: usize,
        usage: TokenUsage,
        accumulated: TokenUsage,
    },
    RowSkipped {
        index: usize,
        reason: String,
    },
    BudgetExceeded {
        index: usize,
        accumulated: TokenUsage,
        capacity: TokenUsage,
    },
}

/// Result of a run: grades per row index plus the accumulated usage.
///
/// A run stopped by the budget is not an error; check [`RunOutcome::status`]
/// or compare `results.len()` to the dataset size.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub results: BTreeMap<usize, Grades>,
    pub usage: TokenUsage,
    pub status: RunStatus,
    /// Rows whose failure was skipped under [`FailurePolicy::SkipRow`].
    pub skipped: Vec<usize>,
    pub log_path: Option<PathBuf>,
    pub budget: BudgetSummary,
}

impl RunOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// The `(results, usage)` pair.
    pub fn into_parts(self) -> (BTreeMap<usize, Grades>, TokenUsage) {
        (self.results, self.usage)
    }
}
