//! Functions injected into an [`Evaluation`](super::Evaluation).
//!
//! Each seam is a trait with a blanket implementation for closures of the
//! matching shape, so plain functions, closures and stateful structs can
//! all be plugged in.

use std::error::Error as StdError;

use serde_json::Value;
use thiserror::Error;

use crate::data::Sample;
use crate::prompt::Message;

/// Extra provider arguments passed through to every completion call.
pub type ModelArgs = serde_json::Map<String, Value>;

/// Turns a dataset row into the message array for one model call.
pub trait Prep {
    fn prepare(&self, sample: &Sample) -> crate::Result<Vec<Message>>;
}

impl<F> Prep for F
where
    F: Fn(&Sample) -> crate::Result<Vec<Message>>,
{
    fn prepare(&self, sample: &Sample) -> crate::Result<Vec<Message>> {
        self(sample)
    }
}

/// Sends messages to a model and returns its raw response.
///
/// Timeouts, retries and rate limiting belong to the implementation; the
/// runner calls it once per row.
pub trait Completion {
    fn complete(
        &self,
        model: Option<&str>,
        messages: &[Message],
        args: &ModelArgs,
    ) -> Result<Value, CompletionError>;
}

impl<F> Completion for F
where
    F: Fn(Option<&str>, &[Message], &ModelArgs) -> Result<Value, CompletionError>,
{
    fn complete(
        &self,
        model: Option<&str>,
        messages: &[Message],
        args: &ModelArgs,
    ) -> Result<Value, CompletionError> {
        self(model, messages, args)
    }
}

/// Failure of a completion function.
#[derive(Error, Debug)]
#[error("completion failed: {message}")]
pub struct CompletionError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl CompletionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
