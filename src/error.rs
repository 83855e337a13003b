//! Crate-wide error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::data::DataError;
use crate::evaluation::CompletionError;
use crate::instruments::InputError;
use crate::prompt::RubricError;
use crate::response::ResponseError;
use crate::runlog::RunLogError;

#[derive(Error, Debug)]
pub enum EvaluationError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error("run log error: {0}")]
    RunLog(#[from] RunLogError),

    #[error(transparent)]
    Rubric(#[from] RubricError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The builder was not given a required function.
    #[error("evaluation has no {0} function")]
    MissingFunction(&'static str),

    /// A row failed and the run was aborted.
    #[error("row {index} failed: {source}")]
    Row {
        index: usize,
        #[source]
        source: Box<EvaluationError>,
    },
}

impl EvaluationError {
    /// The underlying error, unwrapping row context.
    pub fn root(&self) -> &EvaluationError {
        match self {
            EvaluationError::Row { source, .. } => source.root(),
            other => other,
        }
    }

    /// Index of the row that failed, if this came from a run.
    pub fn row_index(&self) -> Option<usize> {
        match self {
            EvaluationError::Row { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Tokens a failed row already spent on its completion.
    pub fn spent_usage(&self) -> Option<crate::TokenUsage> {
        match self.root() {
            EvaluationError::Response(err) => err.usage(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EvaluationError>;
