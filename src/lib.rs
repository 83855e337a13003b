//! Evaluation instruments for grading clinical-note summaries with a
//! generative model acting as judge.
//!
//! # Overview
//!
//! - [`instruments::pdsqi`]: the PDSQI-9 prompt resolver
//! - [`evaluation`]: the run loop with token budget enforcement
//! - [`response`]: post-processors that pull grades and usage out of raw
//!   provider responses
//! - [`runlog`]: append-only logs of every raw response
//! - [`budget`]: [`TokenUsage`] accounting
//!
//! The crate never talks to a model provider itself. Callers inject a
//! completion function that takes the resolved messages and returns the
//! provider's raw JSON response.
//!
//! # Example
//!
//! ```ignore
//! use evaluation_instruments::data::Dataset;
//! use evaluation_instruments::evaluation::Evaluation;
//! use evaluation_instruments::instruments::pdsqi::{pdsqi_from_dir, PdsqiOptions};
//!
//! let evaluation = Evaluation::builder()
//!     .prep(pdsqi_from_dir("data/samples".into(), PdsqiOptions::default())?)
//!     .completion_fn(|model, messages, args| my_provider::chat(model, messages, args))
//!     .max_tokens(100_000)
//!     .build()?;
//!
//! let outcome = evaluation.run_dataset(&Dataset::from_path("data/rows.jsonl")?, Some("judge"), None)?;
//! println!("{} rows graded, {}", outcome.results.len(), outcome.usage);
//! ```

pub mod budget;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod instruments;
pub mod prompt;
pub mod response;
pub mod runlog;

pub use budget::TokenUsage;
pub use config::EvaluationConfig;
pub use error::{EvaluationError, Result};
pub use evaluation::{Evaluation, EvaluationBuilder, RunOutcome};
pub use instruments::InputError;
