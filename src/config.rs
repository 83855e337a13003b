//! Run configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, an
//! optional TOML file, and `EVALUATION_*` environment variables
//! (`EVALUATION_MAX_TOKENS=20000`, `EVALUATION_LOG_DIR=/var/log/evals`, ...).
//!
//! ```toml
//! max_tokens = 50000
//! model = "judge-model"
//! output_mode = "explanation"
//! failure_policy = "skip_row"
//!
//! [model_args]
//! temperature = 0.0
//! ```

use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::budget::{BudgetConfig, DEFAULT_MAX_TOKENS};
use crate::evaluation::{EvaluationBuilder, FailurePolicy, ModelArgs};
use crate::prompt::OutputMode;
use crate::response::ChatCompletionPostProcessor;
use crate::runlog::{RunLogConfig, DEFAULT_RETENTION_DAYS};

/// Prefix of environment variables read by [`EvaluationConfig::load`].
pub const ENV_PREFIX: &str = "EVALUATION";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ::config::ConfigError),

    #[error("invalid value for `{field}`: {message}")]
    Value {
        field: &'static str,
        message: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings for an evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Cap on accumulated total tokens (0 = unlimited).
    pub max_tokens: u64,
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    pub log_enabled: bool,
    /// Defaults to `<temp dir>/evaluation_logs`.
    pub log_dir: Option<PathBuf>,
    /// 0 disables pruning of old run logs.
    pub log_retention_days: u64,
    /// Model name passed to the completion function.
    pub model: Option<String>,
    pub output_mode: OutputMode,
    pub failure_policy: FailurePolicy,
    /// Fail rows whose content has no parseable grade object.
    pub strict_parse: bool,
    pub model_args: ModelArgs,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        let budget = BudgetConfig::default();
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            warning_threshold: budget.warning_threshold,
            critical_threshold: budget.critical_threshold,
            log_enabled: true,
            log_dir: None,
            log_retention_days: DEFAULT_RETENTION_DAYS,
            model: None,
            output_mode: OutputMode::Default,
            failure_policy: FailurePolicy::Abort,
            strict_parse: false,
            model_args: ModelArgs::new(),
        }
    }
}

impl EvaluationConfig {
    /// Load from an optional TOML file plus `EVALUATION_*` variables.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_from(path, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_from(path: Option<&Path>, environment: Environment) -> ConfigResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        builder = builder.add_source(environment.try_parsing(true));

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text without consulting the environment.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("warning_threshold", self.warning_threshold),
            ("critical_threshold", self.critical_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Value {
                    field,
                    message: format!("{value} is outside 0.0..=1.0"),
                });
            }
        }
        if self.warning_threshold > self.critical_threshold {
            return Err(ConfigError::Value {
                field: "warning_threshold",
                message: "must not exceed critical_threshold".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_log_enabled(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_output_mode(mut self, output_mode: OutputMode) -> Self {
        self.output_mode = output_mode;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn budget(&self) -> BudgetConfig {
        BudgetConfig::new()
            .with_max_tokens(self.max_tokens)
            .with_warning_threshold(self.warning_threshold)
            .with_critical_threshold(self.critical_threshold)
    }

    pub fn run_log(&self) -> RunLogConfig {
        RunLogConfig::new(
            self.log_dir
                .clone()
                .unwrap_or_else(RunLogConfig::default_log_dir),
            self.log_retention_days,
        )
    }

    /// Apply budget, logging, model args, failure policy and parse
    /// strictness to a builder. Prep and completion are left to the caller.
    pub fn configure(&self, builder: EvaluationBuilder) -> EvaluationBuilder {
        builder
            .budget(self.budget())
            .log_enabled(self.log_enabled)
            .log_config(self.run_log())
            .model_args(self.model_args.clone())
            .failure_policy(self.failure_policy)
            .post_process(ChatCompletionPostProcessor::new().strict(self.strict_parse))
    }
}
