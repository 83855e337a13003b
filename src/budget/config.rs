//! Token budget configuration.

use serde::{Deserialize, Serialize};

use super::usage::TokenUsage;

/// Default cap on accumulated total tokens for a run.
pub const DEFAULT_MAX_TOKENS: u64 = 10_000;

/// Configuration for run-level budget enforcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum accumulated total tokens (0 = unlimited)
    pub max_tokens: u64,

    /// Warning threshold as a fraction of the budget (0.0 - 1.0)
    pub warning_threshold: f64,

    /// Critical threshold as a fraction of the budget (0.0 - 1.0)
    pub critical_threshold: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            warning_threshold: 0.7,
            critical_threshold: 0.9,
        }
    }
}

impl BudgetConfig {
    /// Create a new budget config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unlimited budget config (no enforcement).
    pub fn unlimited() -> Self {
        Self {
            max_tokens: 0,
            warning_threshold: 1.0,
            critical_threshold: 1.0,
        }
    }

    /// Set the total token budget.
    pub fn with_max_tokens(mut self, tokens: u64) -> Self {
        self.max_tokens = tokens;
        self
    }

    /// Set the warning threshold.
    pub fn with_warning_threshold(mut self, threshold: f64) -> Self {
        self.warning_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the critical threshold.
    pub fn with_critical_threshold(mut self, threshold: f64) -> Self {
        self.critical_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Check if a budget is enforced.
    pub fn is_enabled(&self) -> bool {
        self.max_tokens > 0
    }

    /// The capacity a run is checked against, if any.
    pub fn capacity(&self) -> Option<TokenUsage> {
        self.is_enabled()
            .then(|| TokenUsage::capacity(self.max_tokens))
    }
}
