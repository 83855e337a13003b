//! Token usage accounting.
//!
//! [`TokenUsage`] mirrors the `usage` object returned by chat-completion
//! style providers. Every field is optional because providers are free to
//! omit any of them; arithmetic treats an unset field as zero.

use std::cmp::Ordering;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Prompt, completion and total token counts for one call or a whole run.
///
/// Also used as a capacity: a run's budget is a `TokenUsage` whose
/// `total_tokens` is the cap.
///
/// # Ordering
///
/// Values are ordered by `total_tokens`, with an unset total treated as 0.
/// Two values with the same total but a different breakdown are not
/// comparable (`partial_cmp` returns `None`), so `a > b` is exactly
/// "a's total is strictly greater than b's".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    #[serde(default, alias = "input_tokens")]
    pub prompt_tokens: Option<u64>,
    /// Tokens in the completion.
    #[serde(default, alias = "output_tokens")]
    pub completion_tokens: Option<u64>,
    /// Total tokens, or the limit when used as a capacity.
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

impl TokenUsage {
    /// Create a usage record from three optional counts.
    pub fn new(
        prompt_tokens: Option<u64>,
        completion_tokens: Option<u64>,
        total_tokens: Option<u64>,
    ) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens,
        }
    }

    /// Create a usage record with every count set.
    pub fn from_counts(prompt_tokens: u64, completion_tokens: u64, total_tokens: u64) -> Self {
        Self::new(
            Some(prompt_tokens),
            Some(completion_tokens),
            Some(total_tokens),
        )
    }

    /// A zeroed accumulator.
    pub fn zero() -> Self {
        Self::from_counts(0, 0, 0)
    }

    /// A capacity that only caps the total.
    pub fn capacity(total_tokens: u64) -> Self {
        Self::new(None, None, Some(total_tokens))
    }

    /// Total tokens, unset counting as 0.
    pub fn total(&self) -> u64 {
        self.total_tokens.unwrap_or(0)
    }

    /// Fill an unset total from the prompt and completion counts.
    ///
    /// Providers that report `input_tokens`/`output_tokens` without a total
    /// need this before their usage can be checked against a cap.
    pub fn with_derived_total(mut self) -> Self {
        if self.total_tokens.is_none()
            && (self.prompt_tokens.is_some() || self.completion_tokens.is_some())
        {
            let prompt = self.prompt_tokens.unwrap_or(0);
            let completion = self.completion_tokens.unwrap_or(0);
            self.total_tokens = Some(prompt.saturating_add(completion));
        }
        self
    }

    /// Whether this usage is strictly over `capacity`.
    pub fn exceeds(&self, capacity: &TokenUsage) -> bool {
        self.total() > capacity.total()
    }
}

fn sum_field(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    Some(a.unwrap_or(0).saturating_add(b.unwrap_or(0)))
}

impl Add for TokenUsage {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            prompt_tokens: sum_field(self.prompt_tokens, other.prompt_tokens),
            completion_tokens: sum_field(self.completion_tokens, other.completion_tokens),
            total_tokens: sum_field(self.total_tokens, other.total_tokens),
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for TokenUsage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl PartialOrd for TokenUsage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.total().cmp(&other.total()) {
            Ordering::Equal if self != other => None,
            ordering => Some(ordering),
        }
    }
}

impl fmt::Display for TokenUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn count(value: Option<u64>) -> String {
            value.map_or_else(|| "-".to_string(), |v| v.to_string())
        }
        write!(
            f,
            "prompt={} completion={} total={}",
            count(self.prompt_tokens),
            count(self.completion_tokens),
            count(self.total_tokens)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_elementwise() {
        let sum = TokenUsage::from_counts(1, 2, 3) + TokenUsage::from_counts(4, 5, 6);
        assert_eq!(sum, TokenUsage::from_counts(5, 7, 9));
    }

    #[test]
    fn test_add_treats_unset_as_zero() {
        let sum = TokenUsage::new(None, None, Some(5)) + TokenUsage::from_counts(1, 1, 1);
        assert_eq!(sum, TokenUsage::from_counts(1, 1, 6));
    }

    #[test]
    fn test_add_two_empty_values_yields_zero() {
        let sum = TokenUsage::default() + TokenUsage::default();
        assert_eq!(sum, TokenUsage::zero());
    }

    #[test]
    fn test_add_assign_and_sum() {
        let mut acc = TokenUsage::zero();
        acc += TokenUsage::from_counts(10, 5, 15);
        assert_eq!(acc.total(), 15);

        let total: TokenUsage = vec![
            TokenUsage::from_counts(1, 1, 2),
            TokenUsage::from_counts(2, 2, 4),
        ]
        .into_iter()
        .sum();
        assert_eq!(total, TokenUsage::from_counts(3, 3, 6));
    }

    #[test]
    fn test_ordering_by_total() {
        let cap = TokenUsage::capacity(100);
        assert!(TokenUsage::from_counts(60, 41, 101) > cap);
        assert!(TokenUsage::from_counts(50, 50, 100) <= TokenUsage::from_counts(50, 50, 100));
        assert!(!(TokenUsage::from_counts(50, 50, 100) > cap));
        assert!(TokenUsage::new(None, None, None) < cap);
    }

    #[test]
    fn test_equal_totals_with_different_breakdown_are_incomparable() {
        let a = TokenUsage::from_counts(10, 0, 10);
        let b = TokenUsage::from_counts(0, 10, 10);
        assert_eq!(a.partial_cmp(&b), None);
        assert!(!(a > b));
        assert!(!(a < b));
    }

    #[test]
    fn test_exceeds_is_strict() {
        let cap = TokenUsage::capacity(10);
        assert!(!TokenUsage::from_counts(5, 5, 10).exceeds(&cap));
        assert!(TokenUsage::from_counts(5, 6, 11).exceeds(&cap));
    }

    #[test]
    fn test_deserialize_chat_completion_usage() {
        let usage: TokenUsage = serde_json::from_value(json!({
            "prompt_tokens": 1200,
            "completion_tokens": 80,
            "total_tokens": 1280,
            "prompt_tokens_details": {"cached_tokens": 0}
        }))
        .unwrap();
        assert_eq!(usage, TokenUsage::from_counts(1200, 80, 1280));
    }

    #[test]
    fn test_deserialize_messages_usage_and_derive_total() {
        let usage: TokenUsage =
            serde_json::from_value(json!({"input_tokens": 40, "output_tokens": 2})).unwrap();
        assert_eq!(usage.total_tokens, None);
        assert_eq!(usage.with_derived_total().total_tokens, Some(42));
    }

    #[test]
    fn test_derived_total_keeps_reported_total() {
        let usage = TokenUsage::from_counts(1, 1, 7).with_derived_total();
        assert_eq!(usage.total_tokens, Some(7));
        assert_eq!(TokenUsage::default().with_derived_total().total_tokens, None);
    }

    #[test]
    fn test_display() {
        let usage = TokenUsage::new(Some(3), None, Some(3));
        assert_eq!(usage.to_string(), "prompt=3 completion=- total=3");
    }
}
