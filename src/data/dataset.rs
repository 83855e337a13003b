use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use super::{DataError, DataResult};

/// Column that, when present, overrides the row position as sample index.
pub const INDEX_COLUMN: &str = "index";

/// One dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Key of this row's result in a run outcome.
    pub index: usize,
    pub fields: Map<String, Value>,
}

impl Sample {
    pub fn new(index: usize, fields: Map<String, Value>) -> Self {
        Self { index, fields }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }
}

/// Ordered rows to evaluate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    /// Build from row objects. Indices must be unique.
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> DataResult<Self> {
        let mut seen = HashSet::new();
        let mut samples = Vec::with_capacity(rows.len());

        for (row, fields) in rows.into_iter().enumerate() {
            let index = match fields.get(INDEX_COLUMN) {
                None => row,
                Some(value) => value
                    .as_u64()
                    .and_then(|ix| usize::try_from(ix).ok())
                    .ok_or(DataError::InvalidIndex { row })?,
            };
            if !seen.insert(index) {
                return Err(DataError::DuplicateIndex { index });
            }
            samples.push(Sample::new(index, fields));
        }

        Ok(Self { samples })
    }

    /// Parse a JSON array of objects, or JSON Lines with one object per line.
    pub fn from_json_str(text: &str) -> DataResult<Self> {
        let trimmed = text.trim_start();
        let values: Vec<Value> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed).map_err(|source| DataError::Parse { row: None, source })?
        } else {
            trimmed
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(row, line)| {
                    serde_json::from_str(line).map_err(|source| DataError::Parse {
                        row: Some(row),
                        source,
                    })
                })
                .collect::<DataResult<_>>()?
        };

        let rows = values
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Value::Object(fields) => Ok(fields),
                _ => Err(DataError::NotAnObject { row }),
            })
            .collect::<DataResult<Vec<_>>>()?;

        Self::from_rows(rows)
    }

    pub fn from_path(path: impl AsRef<Path>) -> DataResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Sample> for Dataset {
    fn from_iter<I: IntoIterator<Item = Sample>>(iter: I) -> Self {
        Self {
            samples: iter.into_iter().collect(),
        }
    }
}
