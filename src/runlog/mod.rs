//! Durable run logs.
//!
//! Every row processed by a run has its raw provider response appended to
//! a newline-delimited JSON file, `raw_content_<YYYYMMDD-HHMM>.jsonl`, in
//! the log directory (by default `<temp dir>/evaluation_logs`). Logs can
//! be read back with [`read_records`] to re-grade or audit a run.

mod config;
mod record;
mod store;
mod writer;

pub use config::{
    RunLogConfig, DEFAULT_RETENTION_DAYS, LOG_DIR_ENV_VAR, LOG_DIR_NAME, RETENTION_ENV_VAR,
};
pub use record::RawContentRecord;
pub use store::{
    read_records, RunLogError, RunLogResult, RunLogStore, LOG_FILE_EXTENSION, LOG_FILE_PREFIX,
};
pub use writer::RunLog;
