//! Post-processors turning a raw provider response into grades and usage.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::extract::parse_grades;
use super::grade::Grades;
use crate::budget::TokenUsage;

/// Errors raised while post-processing a provider response.
#[derive(Error, Debug)]
pub enum ResponseError {
    /// A field the response shape requires is absent or has the wrong type.
    #[error("response is missing `{path}`")]
    MissingField { path: &'static str },

    /// The `usage` object does not hold token counts.
    #[error("invalid usage object: {0}")]
    InvalidUsage(#[source] serde_json::Error),

    /// Strict parsing found no grade object in the content.
    ///
    /// `usage` is filled in by the built-in post-processors, which read it
    /// before parsing, so the tokens are still counted against a budget.
    #[error("could not parse grades from content: {reason}")]
    UnparseableContent {
        reason: String,
        usage: Option<TokenUsage>,
    },

    /// Failure reported by a caller-supplied post-processor.
    #[error("{0}")]
    Other(String),
}

impl ResponseError {
    /// Tokens the response spent before post-processing failed, if known.
    pub fn usage(&self) -> Option<TokenUsage> {
        match self {
            ResponseError::UnparseableContent { usage, .. } => *usage,
            _ => None,
        }
    }

    fn with_usage(self, spent: TokenUsage) -> Self {
        match self {
            ResponseError::UnparseableContent { reason, .. } => ResponseError::UnparseableContent {
                reason,
                usage: Some(spent),
            },
            other => other,
        }
    }
}

pub type ResponseResult<T> = Result<T, ResponseError>;

/// Grades and token usage extracted from one response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessedResponse {
    pub grades: Grades,
    pub usage: TokenUsage,
}

impl ProcessedResponse {
    pub fn new(grades: Grades, usage: TokenUsage) -> Self {
        Self { grades, usage }
    }
}

/// Turns a raw provider response into a [`ProcessedResponse`].
///
/// Implemented for any `Fn(&Value) -> ResponseResult<ProcessedResponse>`,
/// so alternate provider shapes can be handled with a closure.
pub trait PostProcess {
    fn process(&self, raw: &Value) -> ResponseResult<ProcessedResponse>;
}

impl<F> PostProcess for F
where
    F: Fn(&Value) -> ResponseResult<ProcessedResponse>,
{
    fn process(&self, raw: &Value) -> ResponseResult<ProcessedResponse> {
        self(raw)
    }
}

fn read_usage(raw: &Value) -> ResponseResult<TokenUsage> {
    let usage = raw
        .get("usage")
        .filter(|usage| usage.is_object())
        .ok_or(ResponseError::MissingField { path: "usage" })?;
    TokenUsage::deserialize(usage).map_err(ResponseError::InvalidUsage)
}

/// Chat-completions shape: `choices[0].message.content` plus `usage`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatCompletionPostProcessor {
    strict: bool,
}

impl ChatCompletionPostProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail instead of degrading to empty grades when content is unparseable.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl PostProcess for ChatCompletionPostProcessor {
    fn process(&self, raw: &Value) -> ResponseResult<ProcessedResponse> {
        let content = raw
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or(ResponseError::MissingField {
                path: "choices[0].message.content",
            })?;
        let usage = read_usage(raw)?;
        let grades = parse_grades(content, self.strict).map_err(|err| err.with_usage(usage))?;
        Ok(ProcessedResponse::new(grades, usage))
    }
}

/// Messages shape: `content[0].text` plus `usage` with
/// `input_tokens`/`output_tokens` and no total.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagesPostProcessor {
    strict: bool,
}

impl MessagesPostProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl PostProcess for MessagesPostProcessor {
    fn process(&self, raw: &Value) -> ResponseResult<ProcessedResponse> {
        let content = raw
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .ok_or(ResponseError::MissingField {
                path: "content[0].text",
            })?;
        let usage = read_usage(raw)?.with_derived_total();
        let grades = parse_grades(content, self.strict).map_err(|err| err.with_usage(usage))?;
        Ok(ProcessedResponse::new(grades, usage))
    }
}
