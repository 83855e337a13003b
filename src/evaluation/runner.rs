use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::functions::{Completion, CompletionError, ModelArgs, Prep};
use super::outcome::{FailurePolicy, RunEvent, RunOutcome, RunStatus};
use crate::budget::{BudgetConfig, BudgetStatus, BudgetTracker, TokenUsage};
use crate::data::{Dataset, Sample};
use crate::error::{EvaluationError, Result};
use crate::prompt::Message;
use crate::response::{
    ChatCompletionPostProcessor, PostProcess, ProcessedResponse, ResponseResult,
};
use crate::runlog::{RunLog, RunLogConfig};

/// An evaluation pipeline: prep, completion and post-processing per row,
/// with a token budget and a durable log of raw responses.
///
/// Built once with [`EvaluationBuilder`] and not modified afterwards; each
/// call to [`Evaluation::run_dataset`] is an independent run with its own
/// accumulator and log file.
pub struct Evaluation {
    prep: Box<dyn Prep>,
    completion: Box<dyn Completion>,
    post_process: Box<dyn PostProcess>,
    run_log: Option<RunLogConfig>,
    budget: BudgetConfig,
    model_args: ModelArgs,
    failure_policy: FailurePolicy,
}

impl Evaluation {
    pub fn builder() -> EvaluationBuilder {
        EvaluationBuilder::new()
    }

    /// The capacity used when a run is not given one.
    pub fn capacity(&self) -> Option<TokenUsage> {
        self.budget.capacity()
    }

    pub fn budget(&self) -> &BudgetConfig {
        &self.budget
    }

    pub fn log_config(&self) -> Option<&RunLogConfig> {
        self.run_log.as_ref()
    }

    pub fn model_args(&self) -> &ModelArgs {
        &self.model_args
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Evaluate every row of `dataset` in order.
    ///
    /// `capacity` overrides the configured budget for this run. The budget
    /// is checked after each row, so the returned usage can exceed it by
    /// one row's cost; rows already graded are always returned.
    pub fn run_dataset(
        &self,
        dataset: &Dataset,
        model: Option<&str>,
        capacity: Option<TokenUsage>,
    ) -> Result<RunOutcome> {
        self.run_dataset_with_progress(dataset, model, capacity, |_| {})
    }

    /// [`run_dataset`](Self::run_dataset) with a callback for progress events.
    pub fn run_dataset_with_progress<F>(
        &self,
        dataset: &Dataset,
        model: Option<&str>,
        capacity: Option<TokenUsage>,
        mut on_event: F,
    ) -> Result<RunOutcome>
    where
        F: FnMut(RunEvent),
    {
        let capacity = capacity.or_else(|| self.budget.capacity());
        let mut tracker = BudgetTracker::with_capacity(capacity, &self.budget);
        let mut log = self.run_log.as_ref().map(RunLog::new);
        let mut results = BTreeMap::new();
        let mut skipped = Vec::new();
        let mut status = RunStatus::Completed;
        let mut last_status = BudgetStatus::Ok;

        debug!(
            rows = dataset.len(),
            log_enabled = log.is_some(),
            capacity = ?capacity.map(|cap| cap.total()),
            "Starting run"
        );

        for sample in dataset {
            let index = sample.index;
            on_event(RunEvent::RowStarted { index });

            let (usage, grades) = match self.evaluate_row(sample, model, log.as_mut()) {
                Ok(processed) => (processed.usage, Some(processed.grades)),
                Err(err) => {
                    if self.failure_policy == FailurePolicy::Abort
                        || matches!(err, EvaluationError::RunLog(_))
                    {
                        return Err(EvaluationError::Row {
                            index,
                            source: Box::new(err),
                        });
                    }
                    warn!(index, error = %err, "Skipping row");
                    skipped.push(index);
                    on_event(RunEvent::RowSkipped {
                        index,
                        reason: err.to_string(),
                    });
                    // A row that failed after its completion still spent tokens.
                    match err.spent_usage() {
                        Some(usage) => (usage, None),
                        None => continue,
                    }
                }
            };

            let budget_status = tracker.record(usage);
            if let Some(grades) = grades {
                results.insert(index, grades);
                debug!(index, "Completed evaluation");
                on_event(RunEvent::RowCompleted {
                    index,
                    usage,
                    accumulated: tracker.accumulated(),
                });
            }

            if budget_status.should_warn() && budget_status > last_status {
                info!(
                    index,
                    percent = tracker.usage_percent() * 100.0,
                    "Token budget {:?}",
                    budget_status
                );
            }
            last_status = budget_status;

            if !budget_status.should_continue() {
                let accumulated = tracker.accumulated();
                let capacity = tracker.capacity().unwrap_or_default();
                warn!(
                    "Aborting run after {}. Capacity exceeded: {} > {}",
                    index, accumulated, capacity
                );
                status = RunStatus::BudgetExceeded;
                on_event(RunEvent::BudgetExceeded {
                    index,
                    accumulated,
                    capacity,
                });
                break;
            }
        }

        let log_path = log.and_then(RunLog::into_path);
        if let Some(path) = &log_path {
            info!(path = %path.display(), "Dumped raw content");
        }

        Ok(RunOutcome {
            results,
            usage: tracker.accumulated(),
            status,
            skipped,
            log_path,
            budget: tracker.summary(),
        })
    }

    /// Prep, complete and post-process one row.
    ///
    /// The raw response is logged whenever the completion returned one,
    /// including when post-processing then fails.
    fn evaluate_row(
        &self,
        sample: &Sample,
        model: Option<&str>,
        log: Option<&mut RunLog>,
    ) -> Result<ProcessedResponse> {
        let messages = self.prep.prepare(sample)?;
        let raw = self
            .completion
            .complete(model, &messages, &self.model_args)?;
        let processed = self.post_process.process(&raw);

        if let Some(log) = log {
            log.append(sample.index, &raw)?;
        }

        Ok(processed?)
    }
}

impl fmt::Debug for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluation")
            .field("run_log", &self.run_log)
            .field("budget", &self.budget)
            .field("model_args", &self.model_args)
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Evaluation`].
///
/// Prep and completion functions are required. Post-processing defaults to
/// [`ChatCompletionPostProcessor`], logging to [`RunLogConfig::from_env`]
/// and the budget to [`BudgetConfig::default`].
pub struct EvaluationBuilder {
    prep: Option<Box<dyn Prep>>,
    completion: Option<Box<dyn Completion>>,
    post_process: Option<Box<dyn PostProcess>>,
    log_enabled: bool,
    log_config: Option<RunLogConfig>,
    budget: BudgetConfig,
    model_args: ModelArgs,
    failure_policy: FailurePolicy,
}

impl Default for EvaluationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluationBuilder {
    pub fn new() -> Self {
        Self {
            prep: None,
            completion: None,
            post_process: None,
            log_enabled: true,
            log_config: None,
            budget: BudgetConfig::default(),
            model_args: ModelArgs::new(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn prep(mut self, prep: impl Prep + 'static) -> Self {
        self.prep = Some(Box::new(prep));
        self
    }

    /// Closure form of [`prep`](Self::prep).
    pub fn prep_fn<F>(self, prep: F) -> Self
    where
        F: Fn(&Sample) -> Result<Vec<Message>> + 'static,
    {
        self.prep(prep)
    }

    pub fn completion(mut self, completion: impl Completion + 'static) -> Self {
        self.completion = Some(Box::new(completion));
        self
    }

    /// Closure form of [`completion`](Self::completion).
    pub fn completion_fn<F>(self, completion: F) -> Self
    where
        F: Fn(Option<&str>, &[Message], &ModelArgs) -> std::result::Result<Value, CompletionError>
            + 'static,
    {
        self.completion(completion)
    }

    pub fn post_process(mut self, post_process: impl PostProcess + 'static) -> Self {
        self.post_process = Some(Box::new(post_process));
        self
    }

    /// Closure form of [`post_process`](Self::post_process).
    pub fn post_process_fn<F>(self, post_process: F) -> Self
    where
        F: Fn(&Value) -> ResponseResult<ProcessedResponse> + 'static,
    {
        self.post_process(post_process)
    }

    pub fn log_enabled(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    pub fn log_config(mut self, config: RunLogConfig) -> Self {
        self.log_config = Some(config);
        self
    }

    pub fn budget(mut self, budget: BudgetConfig) -> Self {
        self.budget = budget;
        self
    }

    /// Cap accumulated total tokens (0 disables the cap).
    pub fn max_tokens(mut self, max_tokens: u64) -> Self {
        self.budget = self.budget.with_max_tokens(max_tokens);
        self
    }

    pub fn model_args(mut self, model_args: ModelArgs) -> Self {
        self.model_args = model_args;
        self
    }

    pub fn model_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.model_args.insert(key.into(), value.into());
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn build(self) -> Result<Evaluation> {
        let prep = self.prep.ok_or(EvaluationError::MissingFunction("prep"))?;
        let completion = self
            .completion
            .ok_or(EvaluationError::MissingFunction("completion"))?;
        let post_process = self
            .post_process
            .unwrap_or_else(|| Box::new(ChatCompletionPostProcessor::new()));
        let run_log = self
            .log_enabled
            .then(|| self.log_config.unwrap_or_else(RunLogConfig::from_env));

        debug!(
            log_enabled = self.log_enabled,
            max_tokens = self.budget.max_tokens,
            "Set up evaluation"
        );

        Ok(Evaluation {
            prep,
            completion,
            post_process,
            run_log,
            budget: self.budget,
            model_args: self.model_args,
            failure_policy: self.failure_policy,
        })
    }
}
