//! Per-sample JSON file adapter.
//!
//! Rows of a dataset usually hold only an identifier. [`JsonFileLoader`]
//! maps a row to `<dir>/<key>.json`, reads it and hands the contents on, so
//! a resolver can be written against file contents instead of rows.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{DataError, DataResult, Sample};

type KeyFn = dyn Fn(&Sample) -> DataResult<String> + Send + Sync;

/// Reads the JSON file named after a sample.
pub struct JsonFileLoader {
    key_fn: Box<KeyFn>,
    dir: Option<PathBuf>,
}

impl JsonFileLoader {
    pub fn new<F>(key_fn: F, dir: Option<PathBuf>) -> Self
    where
        F: Fn(&Sample) -> DataResult<String> + Send + Sync + 'static,
    {
        Self {
            key_fn: Box::new(key_fn),
            dir,
        }
    }

    /// Key files by the value of `column` (a string or an integer).
    pub fn from_column(column: impl Into<String>, dir: Option<PathBuf>) -> Self {
        let column = column.into();
        Self::new(
            move |sample: &Sample| match sample.get(&column) {
                Some(Value::String(key)) => Ok(key.clone()),
                Some(Value::Number(key)) => Ok(key.to_string()),
                _ => Err(DataError::MissingColumn {
                    column: column.clone(),
                    index: sample.index,
                }),
            },
            dir,
        )
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn path_for(&self, sample: &Sample) -> DataResult<PathBuf> {
        let filename = format!("{}.json", (self.key_fn)(sample)?);
        Ok(match &self.dir {
            Some(dir) => dir.join(filename),
            None => PathBuf::from(filename),
        })
    }

    /// Read the sample's file. A missing file reads as an empty object.
    pub fn load(&self, sample: &Sample) -> DataResult<Value> {
        let path = self.path_for(sample)?;
        if !path.is_file() {
            debug!(path = %path.display(), index = sample.index, "Sample file not found, using empty object");
            return Ok(Value::Object(Default::default()));
        }

        let text = fs::read_to_string(&path).map_err(|source| DataError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| DataError::File { path, source })
    }

    /// Read the sample's file into a typed record.
    pub fn load_as<T: DeserializeOwned>(&self, sample: &Sample) -> DataResult<T> {
        let value = self.load(sample)?;
        serde_json::from_value(value).map_err(|source| DataError::Record {
            index: sample.index,
            source,
        })
    }

    /// Compose with a function of the file contents, yielding a function of
    /// the sample.
    pub fn then<T, R, E, F>(self, f: F) -> impl Fn(&Sample) -> Result<R, E>
    where
        T: DeserializeOwned,
        F: Fn(T) -> Result<R, E>,
        E: From<DataError>,
    {
        move |sample: &Sample| {
            let record: T = self.load_as(sample)?;
            f(record)
        }
    }
}

impl fmt::Debug for JsonFileLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFileLoader")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};
    use tempfile::TempDir;

    fn sample(index: usize, fields: Value) -> Sample {
        let Value::Object(fields) = fields else {
            panic!("fields must be an object");
        };
        Sample::new(index, fields)
    }

    #[test]
    fn test_path_for_joins_dir() {
        let loader = JsonFileLoader::from_column("guid", Some(PathBuf::from("/data")));
        let path = loader.path_for(&sample(0, json!({"guid": "abc"}))).unwrap();
        assert_eq!(path, PathBuf::from("/data/abc.json"));
    }

    #[test]
    fn test_integer_key() {
        let loader = JsonFileLoader::from_column("guid", None);
        let path = loader.path_for(&sample(0, json!({"guid": 42}))).unwrap();
        assert_eq!(path, PathBuf::from("42.json"));
    }

    #[test]
    fn test_missing_column_is_error() {
        let loader = JsonFileLoader::from_column("guid", None);
        let err = loader.load(&sample(7, json!({"id": "abc"}))).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn { index: 7, .. }));
    }

    #[test]
    fn test_load_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("abc.json"), r#"{"summary": "s"}"#).unwrap();

        let loader = JsonFileLoader::from_column("guid", Some(temp_dir.path().to_path_buf()));
        let value = loader.load(&sample(0, json!({"guid": "abc"}))).unwrap();
        assert_eq!(value, json!({"summary": "s"}));
    }

    #[test]
    fn test_missing_file_reads_as_empty_object() {
        let temp_dir = TempDir::new().unwrap();
        let loader = JsonFileLoader::from_column("guid", Some(temp_dir.path().to_path_buf()));
        let value = loader.load(&sample(0, json!({"guid": "nope"}))).unwrap();
        assert_eq!(value, Value::Object(Map::new()));
    }

    #[test]
    fn test_invalid_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("bad.json"), "{not json").unwrap();

        let loader = JsonFileLoader::from_column("guid", Some(temp_dir.path().to_path_buf()));
        let err = loader.load(&sample(0, json!({"guid": "bad"}))).unwrap_err();
        assert!(matches!(err, DataError::File { .. }));
    }

    #[test]
    fn test_custom_key_fn_and_then() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("row-3.json"), r#"{"summary": "short"}"#).unwrap();

        let loader = JsonFileLoader::new(
            |sample: &Sample| Ok(format!("row-{}", sample.index)),
            Some(temp_dir.path().to_path_buf()),
        );
        let summary_len = loader.then(|record: Value| -> Result<usize, DataError> {
            Ok(record["summary"].as_str().unwrap_or_default().len())
        });

        assert_eq!(summary_len(&sample(3, json!({}))).unwrap(), 5);
    }
}
