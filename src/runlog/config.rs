use std::env;
use std::path::PathBuf;

/// Environment variable overriding the run log directory.
pub const LOG_DIR_ENV_VAR: &str = "EVALUATION_LOG_DIR";

/// Environment variable for run log retention period (days).
pub const RETENTION_ENV_VAR: &str = "EVALUATION_LOG_RETENTION_DAYS";

/// Default retention period in days.
pub const DEFAULT_RETENTION_DAYS: u64 = 30;

/// Directory created under the system temp dir when no log dir is set.
pub const LOG_DIR_NAME: &str = "evaluation_logs";

/// Configuration for run log storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLogConfig {
    /// Directory holding `raw_content_*.jsonl` files.
    pub log_dir: PathBuf,
    /// Retention period in days (0 disables retention pruning).
    pub retention_days: u64,
}

impl RunLogConfig {
    pub fn new(log_dir: impl Into<PathBuf>, retention_days: u64) -> Self {
        Self {
            log_dir: log_dir.into(),
            retention_days,
        }
    }

    /// `<system temp dir>/evaluation_logs`.
    pub fn default_log_dir() -> PathBuf {
        env::temp_dir().join(LOG_DIR_NAME)
    }

    /// Build config from environment variables.
    pub fn from_env() -> Self {
        let log_dir = env::var_os(LOG_DIR_ENV_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(Self::default_log_dir);
        let retention_days = env::var(RETENTION_ENV_VAR)
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETENTION_DAYS);
        Self {
            log_dir,
            retention_days,
        }
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    pub fn with_retention_days(mut self, retention_days: u64) -> Self {
        self.retention_days = retention_days;
        self
    }
}

impl Default for RunLogConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
