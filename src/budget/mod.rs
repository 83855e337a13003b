//! Token usage accounting and budget enforcement.
//!
//! # Overview
//!
//! - **TokenUsage**: three optional counts with null-tolerant `+` and an
//!   ordering by total, used both for per-call usage and for a run's cap
//! - **BudgetConfig**: the default cap and warning thresholds
//! - **BudgetTracker**: accumulates row usage during a run and reports a
//!   [`BudgetStatus`]
//! - **TokenEstimator**: estimates prompt size before any call is made
//!
//! # Example
//!
//! ```ignore
//! use evaluation_instruments::budget::{BudgetConfig, BudgetTracker, TokenUsage};
//!
//! let config = BudgetConfig::default().with_max_tokens(5_000);
//! let mut tracker = BudgetTracker::new(&config);
//!
//! let status = tracker.record(TokenUsage::from_counts(1_800, 120, 1_920));
//! if !status.should_continue() {
//!     // stop issuing calls
//! }
//! ```

mod config;
mod estimator;
mod tracker;
mod usage;

pub use config::{BudgetConfig, DEFAULT_MAX_TOKENS};
pub use estimator::{EstimationMethod, TokenEstimator};
pub use tracker::{BudgetStatus, BudgetSummary, BudgetTracker};
pub use usage::TokenUsage;
