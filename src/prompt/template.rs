//! Placeholder templates with partial, repeatable filling.
//!
//! Instrument prompts are resolved twice. The first pass bakes in what is
//! fixed for a use case (rubric set, instructions); the second fills what
//! belongs to one sample (notes, summary). [`PromptTemplate::fill`] only
//! touches the placeholders it is given, and never rescans substituted
//! text, so note or summary content containing braces is left alone.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::warn;

use super::rubric::{RubricError, RubricResult, RubricSet};

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Text with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Substitute the given placeholders; all others stay in place.
    pub fn fill<K, V>(&self, values: &[(K, V)]) -> PromptTemplate
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let lookup: HashMap<&str, &str> = values
            .iter()
            .map(|(key, value)| (key.as_ref(), value.as_ref()))
            .collect();

        let text = placeholder_regex().replace_all(&self.text, |caps: &Captures<'_>| {
            match lookup.get(&caps[1]) {
                Some(value) => (*value).to_string(),
                None => caps[0].to_string(),
            }
        });

        PromptTemplate::new(text)
    }

    /// Names of placeholders that are still unfilled, in order of first
    /// appearance.
    pub fn missing_placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for caps in placeholder_regex().captures_iter(&self.text) {
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Placeholder that receives the rendered rubric set.
pub const RUBRIC_SET_PLACEHOLDER: &str = "RUBRIC_SET";

/// First-pass compilation of an instrument prompt.
///
/// Renders the selected rubrics (all of them when `rubric_keys` is None)
/// into `{RUBRIC_SET}` alongside the use-case specific `values`. The result
/// still carries the per-sample placeholders. Requested keys that are not
/// in the rubric set are dropped with a warning; if nothing is left to
/// render the compilation fails with [`RubricError::EmptySelection`].
pub fn compile_prompt<K, V>(
    pattern: &PromptTemplate,
    values: &[(K, V)],
    rubrics: &RubricSet,
    rubric_keys: Option<&[&str]>,
) -> RubricResult<PromptTemplate>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let selected = match rubric_keys {
        Some(keys) => {
            let (subset, unknown) = rubrics.select(keys);
            if !unknown.is_empty() {
                warn!(
                    "Requested rubric keys not found, omitting: {}",
                    unknown.join(", ")
                );
            }
            subset
        }
        None => rubrics.clone(),
    };
    if selected.is_empty() {
        return Err(RubricError::EmptySelection {
            requested: rubric_keys
                .unwrap_or_default()
                .iter()
                .map(|key| key.to_string())
                .collect(),
        });
    }

    let mut pairs: Vec<(String, String)> = values
        .iter()
        .map(|(key, value)| (key.as_ref().to_string(), value.as_ref().to_string()))
        .collect();
    pairs.push((RUBRIC_SET_PLACEHOLDER.to_string(), selected.render()));

    Ok(pattern.fill(&pairs))
}
