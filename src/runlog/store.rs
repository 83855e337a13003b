use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Local, Utc};
use thiserror::Error;
use tracing::debug;

use super::config::RunLogConfig;
use super::record::RawContentRecord;

/// File name prefix of run logs.
pub const LOG_FILE_PREFIX: &str = "raw_content_";

/// File name extension of run logs.
pub const LOG_FILE_EXTENSION: &str = "jsonl";

/// Errors that can occur during run log operations.
#[derive(Error, Debug)]
pub enum RunLogError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A line of a log file is not a run log record
    #[error("invalid record at {path}:{line}: {source}")]
    InvalidRecord {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for run log operations.
pub type RunLogResult<T> = Result<T, RunLogError>;

/// Directory of run logs on the local filesystem.
#[derive(Debug, Clone)]
pub struct RunLogStore {
    log_dir: PathBuf,
    retention_days: u64,
}

impl RunLogStore {
    /// The directory itself is only created when a log is first written.
    pub fn new(config: &RunLogConfig) -> Self {
        Self {
            log_dir: config.log_dir.clone(),
            retention_days: config.retention_days,
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// `raw_content_<YYYYMMDD-HHMM>.jsonl` for the given start time.
    ///
    /// Names have minute resolution, so runs started within the same minute
    /// append to the same file.
    pub fn log_path_at(&self, started_at: DateTime<Local>) -> PathBuf {
        self.log_dir.join(format!(
            "{}{}.{}",
            LOG_FILE_PREFIX,
            started_at.format("%Y%m%d-%H%M"),
            LOG_FILE_EXTENSION
        ))
    }

    /// Create the log directory and name a log for a run starting now.
    pub fn new_log_path(&self) -> RunLogResult<PathBuf> {
        fs::create_dir_all(&self.log_dir)?;
        Ok(self.log_path_at(Local::now()))
    }

    /// Run log files in the directory, oldest name first.
    pub fn list_logs(&self) -> RunLogResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.log_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(RunLogError::Io(err)),
        };

        let mut logs = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() && is_log_file(&entry.path()) {
                logs.push(entry.path());
            }
        }
        logs.sort();
        Ok(logs)
    }

    /// Logs modified before this instant are expired.
    ///
    /// `None` when retention is disabled or the window reaches past the
    /// earliest representable time, in which case nothing expires.
    fn retention_cutoff(&self) -> Option<DateTime<Utc>> {
        if self.retention_days == 0 {
            return None;
        }
        let window = Duration::try_days(i64::try_from(self.retention_days).ok()?)?;
        Utc::now().checked_sub_signed(window)
    }

    /// Apply retention rules and delete expired logs.
    pub fn enforce_retention(&self) -> RunLogResult<usize> {
        let Some(cutoff) = self.retention_cutoff() else {
            debug!(retention_days = self.retention_days, "No logs expire");
            return Ok(0);
        };
        let mut deleted = 0;

        for path in self.list_logs()? {
            let modified: DateTime<Utc> = fs::metadata(&path)?.modified()?.into();
            if modified < cutoff {
                match fs::remove_file(&path) {
                    Ok(()) => deleted += 1,
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => return Err(RunLogError::Io(err)),
                }
            }
        }

        Ok(deleted)
    }
}

fn is_log_file(path: &Path) -> bool {
    let has_prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX));
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext == LOG_FILE_EXTENSION);
    has_prefix && has_extension
}

/// Read every record of a run log, skipping blank lines.
pub fn read_records(path: impl AsRef<Path>) -> RunLogResult<Vec<RawContentRecord>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(ix, line)| {
            serde_json::from_str(line).map_err(|source| RunLogError::InvalidRecord {
                path: path.to_path_buf(),
                line: ix + 1,
                source,
            })
        })
        .collect()
}
