//! Token estimation utilities.
//!
//! Exact counts only come back in a provider's `usage` object, after the
//! call. This module estimates a resolved prompt's size up front from
//! character and word counts, so a dry run can tell whether a dataset is
//! likely to fit under a budget.

use serde::{Deserialize, Serialize};

use crate::prompt::Message;

/// Chat formatting overhead per message (role markers, separators).
const TOKENS_PER_MESSAGE: u64 = 4;

/// Priming overhead added once per request for the assistant reply.
const REPLY_PRIMING_TOKENS: u64 = 3;

/// Heuristic used to turn text into a token count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    /// About 3.5 characters per token.
    CharacterBased,
    /// About 1.3 tokens per whitespace-separated word.
    WordBased,
    /// The larger of the two, scaled by a safety margin.
    #[default]
    Conservative,
}

const CHARS_PER_TOKEN: f64 = 3.5;
const TOKENS_PER_WORD: f64 = 1.3;
const DEFAULT_SAFETY_MARGIN: f64 = 1.2;

fn by_chars(text: &str) -> f64 {
    text.chars().count() as f64 / CHARS_PER_TOKEN
}

fn by_words(text: &str) -> f64 {
    text.split_whitespace().count() as f64 * TOKENS_PER_WORD
}

/// Estimates the prompt size of resolved messages before they are sent.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenEstimator {
    method: EstimationMethod,
    safety_margin: f64,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(EstimationMethod::Conservative)
    }
}

impl TokenEstimator {
    pub fn new(method: EstimationMethod) -> Self {
        let safety_margin = match method {
            EstimationMethod::Conservative => DEFAULT_SAFETY_MARGIN,
            EstimationMethod::CharacterBased | EstimationMethod::WordBased => 1.0,
        };
        Self {
            method,
            safety_margin,
        }
    }

    /// Conservative estimator with a custom margin (never below 1.0).
    pub fn conservative(safety_margin: f64) -> Self {
        Self {
            method: EstimationMethod::Conservative,
            safety_margin: safety_margin.max(1.0),
        }
    }

    pub fn method(&self) -> EstimationMethod {
        self.method
    }

    /// Estimated tokens in `text`.
    pub fn estimate(&self, text: &str) -> u64 {
        let raw = match self.method {
            EstimationMethod::CharacterBased => by_chars(text),
            EstimationMethod::WordBased => by_words(text),
            EstimationMethod::Conservative => by_chars(text).max(by_words(text)),
        };
        (raw.ceil() * self.safety_margin).ceil() as u64
    }

    /// Estimate prompt tokens for a resolved message list, including the
    /// per-message chat formatting overhead.
    pub fn estimate_messages(&self, messages: &[Message]) -> u64 {
        if messages.is_empty() {
            return 0;
        }
        let content: u64 = messages
            .iter()
            .map(|message| self.estimate(&message.content) + TOKENS_PER_MESSAGE)
            .sum();
        content + REPLY_PRIMING_TOKENS
    }
}
