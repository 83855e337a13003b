//! Dataset rows and per-sample files.

mod dataset;
mod loader;
mod record;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub use dataset::{Dataset, Sample, INDEX_COLUMN};
pub use loader::JsonFileLoader;
pub use record::SummaryRecord;

/// Errors raised while loading datasets or sample files.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The dataset text is not JSON (row is set for JSON Lines input).
    #[error("invalid dataset JSON{}: {source}", line_suffix(.row))]
    Parse {
        row: Option<usize>,
        #[source]
        source: serde_json::Error,
    },

    #[error("dataset row {row} is not a JSON object")]
    NotAnObject { row: usize },

    #[error("dataset row {row} has a non-integer `index`")]
    InvalidIndex { row: usize },

    #[error("duplicate sample index {index}")]
    DuplicateIndex { index: usize },

    #[error("sample {index} has no usable `{column}` column")]
    MissingColumn { column: String, index: usize },

    #[error("invalid JSON in {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The sample file does not match the expected record shape.
    #[error("sample {index} file does not match the expected record: {source}")]
    Record {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

pub type DataResult<T> = Result<T, DataError>;

fn line_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" at line {}", r + 1)).unwrap_or_default()
}
