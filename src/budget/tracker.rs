//! Run budget tracking and enforcement.

use serde::{Deserialize, Serialize};

use super::config::BudgetConfig;
use super::usage::TokenUsage;

/// Status of budget usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Under warning threshold, all good
    Ok,
    /// Approaching budget limit (over warning threshold)
    Warning,
    /// Near budget limit (over critical threshold)
    Critical,
    /// Accumulated usage is strictly over the capacity
    Exceeded,
}

impl BudgetStatus {
    /// Check if execution should continue.
    pub fn should_continue(&self) -> bool {
        !matches!(self, BudgetStatus::Exceeded)
    }

    /// Check if warnings should be emitted.
    pub fn should_warn(&self) -> bool {
        matches!(self, BudgetStatus::Warning | BudgetStatus::Critical)
    }
}

/// Accumulates per-row usage for one run and checks it against a capacity.
///
/// The check is post-hoc: a row is always recorded before the cap is
/// tested, so the final accumulated usage may overshoot the capacity by up
/// to one row's cost.
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    capacity: Option<TokenUsage>,
    accumulated: TokenUsage,
    rows: usize,
    warning_threshold: f64,
    critical_threshold: f64,
}

impl BudgetTracker {
    /// Create a tracker for the config's own capacity.
    pub fn new(config: &BudgetConfig) -> Self {
        Self::with_capacity(config.capacity(), config)
    }

    /// Create a tracker with an explicit capacity (None = unlimited).
    pub fn with_capacity(capacity: Option<TokenUsage>, config: &BudgetConfig) -> Self {
        Self {
            capacity,
            accumulated: TokenUsage::zero(),
            rows: 0,
            warning_threshold: config.warning_threshold,
            critical_threshold: config.critical_threshold,
        }
    }

    /// Record one row's usage and return the resulting status.
    pub fn record(&mut self, usage: TokenUsage) -> BudgetStatus {
        self.accumulated += usage;
        self.rows += 1;
        self.status()
    }

    /// Accumulated usage so far.
    pub fn accumulated(&self) -> TokenUsage {
        self.accumulated
    }

    /// The capacity being enforced.
    pub fn capacity(&self) -> Option<TokenUsage> {
        self.capacity
    }

    /// Number of rows recorded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Remaining total tokens before the cap (None when unlimited).
    pub fn remaining(&self) -> Option<u64> {
        self.capacity
            .map(|cap| cap.total().saturating_sub(self.accumulated.total()))
    }

    /// Get usage as a fraction of the capacity.
    pub fn usage_percent(&self) -> f64 {
        match self.capacity {
            Some(cap) if cap.total() > 0 => {
                self.accumulated.total() as f64 / cap.total() as f64
            }
            _ => 0.0,
        }
    }

    /// Whether accumulated usage is over the capacity.
    pub fn is_exceeded(&self) -> bool {
        self.capacity
            .map(|cap| self.accumulated > cap)
            .unwrap_or(false)
    }

    /// Current budget status.
    pub fn status(&self) -> BudgetStatus {
        if self.capacity.is_none() {
            return BudgetStatus::Ok;
        }
        if self.is_exceeded() {
            return BudgetStatus::Exceeded;
        }
        let usage = self.usage_percent();
        if usage >= self.critical_threshold {
            BudgetStatus::Critical
        } else if usage >= self.warning_threshold {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Ok
        }
    }

    /// Get a summary of budget usage.
    pub fn summary(&self) -> BudgetSummary {
        BudgetSummary {
            accumulated: self.accumulated,
            capacity: self.capacity,
            rows: self.rows,
            status: self.status(),
        }
    }
}

/// Summary of budget usage for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub accumulated: TokenUsage,
    pub capacity: Option<TokenUsage>,
    pub rows: usize,
    pub status: BudgetStatus,
}

impl BudgetSummary {
    /// Format as a human-readable string.
    pub fn format(&self) -> String {
        let mut output = String::from("## Token Budget Summary\n\n");

        output.push_str(&format!(
            "**Tokens Used**: {} ({} prompt, {} completion)\n",
            self.accumulated.total(),
            self.accumulated.prompt_tokens.unwrap_or(0),
            self.accumulated.completion_tokens.unwrap_or(0)
        ));

        if let Some(cap) = self.capacity.filter(|cap| cap.total() > 0) {
            let percent = (self.accumulated.total() as f64 / cap.total() as f64) * 100.0;
            output.push_str(&format!(
                "**Budget**: {}/{} ({:.1}%) [{}]\n",
                self.accumulated.total(),
                cap.total(),
                percent,
                format_status(self.status)
            ));
        } else {
            output.push_str("**Budget**: unlimited\n");
        }

        output.push_str(&format!("**Rows Evaluated**: {}\n", self.rows));

        output
    }
}

/// Format a budget status for display.
fn format_status(status: BudgetStatus) -> &'static str {
    match status {
        BudgetStatus::Ok => "OK",
        BudgetStatus::Warning => "WARNING",
        BudgetStatus::Critical => "CRITICAL",
        BudgetStatus::Exceeded => "EXCEEDED",
    }
}
