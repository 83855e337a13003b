use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::config::RunLogConfig;
use super::record::RawContentLine;
use super::store::{RunLogResult, RunLogStore};

/// Append-only log of raw responses for one run.
///
/// The file is named on the first append and reused afterwards. Every
/// append opens the file, writes one line, syncs and closes it, so a crash
/// mid-run loses at most the row being written.
#[derive(Debug)]
pub struct RunLog {
    store: RunLogStore,
    path: Option<PathBuf>,
}

impl RunLog {
    pub fn new(config: &RunLogConfig) -> Self {
        Self {
            store: RunLogStore::new(config),
            path: None,
        }
    }

    /// Path of the log file, once something has been written.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn into_path(self) -> Option<PathBuf> {
        self.path
    }

    /// Append `{"sample_ix", "raw_content"}` as one line.
    pub fn append(&mut self, sample_ix: usize, raw_content: &Value) -> RunLogResult<&Path> {
        let path = match self.path.take() {
            Some(path) => path,
            None => self.open_new_log()?,
        };

        let line = serde_json::to_string(&RawContentLine {
            sample_ix,
            raw_content,
        })?;

        let written = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| {
                writeln!(file, "{}", line)?;
                file.sync_all()
            });
        let path = self.path.insert(path);
        written?;

        Ok(path.as_path())
    }

    fn open_new_log(&self) -> RunLogResult<PathBuf> {
        match self.store.enforce_retention() {
            Ok(0) => {}
            Ok(deleted) => debug!(deleted, "Pruned expired run logs"),
            Err(err) => warn!(
                "Failed to prune run logs in {}: {}",
                self.store.log_dir().display(),
                err
            ),
        }
        self.store.new_log_path()
    }
}
