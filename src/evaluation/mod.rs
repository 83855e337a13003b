//! The evaluation run loop.
//!
//! One pass over a dataset, strictly sequential:
//!
//! 1. prep resolves the row's message array
//! 2. the completion function calls the model
//! 3. the post-processor extracts grades and usage
//! 4. usage is added to the run's accumulator and the raw response is
//!    appended to the run log
//! 5. the grades are stored under the row index
//!
//! After each row the accumulator is checked against the capacity; once it
//! is strictly greater the run stops and returns what it has. Errors from
//! the injected functions abort the run unless [`FailurePolicy::SkipRow`]
//! is set.

mod functions;
mod outcome;
mod runner;

pub use functions::{Completion, CompletionError, ModelArgs, Prep};
pub use outcome::{FailurePolicy, RunEvent, RunOutcome, RunStatus};
pub use runner::{Evaluation, EvaluationBuilder};
