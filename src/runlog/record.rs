use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of a run log: the untouched provider response for a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContentRecord {
    pub sample_ix: usize,
    pub raw_content: Value,
}

impl RawContentRecord {
    pub fn new(sample_ix: usize, raw_content: Value) -> Self {
        Self {
            sample_ix,
            raw_content,
        }
    }
}

/// Borrowed form used when appending, so responses are not cloned.
#[derive(Debug, Serialize)]
pub(crate) struct RawContentLine<'a> {
    pub sample_ix: usize,
    pub raw_content: &'a Value,
}
