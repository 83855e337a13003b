//! Output modes and grading-instruction resolution.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Granularity of the grades requested from the model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Whatever the instrument was published with.
    #[default]
    Default,
    /// A bare grade per metric.
    #[serde(alias = "score_only")]
    Score,
    /// `{explanation, score}` per metric.
    #[serde(alias = "with_explanation")]
    Explanation,
}

impl OutputMode {
    /// Resolve `Default` to the instrument's own mode.
    pub fn resolve(self, default_mode: OutputMode) -> OutputMode {
        match self {
            OutputMode::Default => default_mode,
            mode => mode,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Default => "default",
            OutputMode::Score => "score",
            OutputMode::Explanation => "explanation",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown output mode `{0}` (expected default, score or explanation)")]
pub struct ParseOutputModeError(String);

impl FromStr for OutputMode {
    type Err = ParseOutputModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(OutputMode::Default),
            "score" | "score_only" => Ok(OutputMode::Score),
            "explanation" | "with_explanation" => Ok(OutputMode::Explanation),
            _ => Err(ParseOutputModeError(s.to_string())),
        }
    }
}

/// Build the instruction block for a prompt.
///
/// In `Explanation` mode every line whose index is listed in
/// `detail_overrides` is replaced by the override; an empty override drops
/// the line. Other modes use `instructions` unchanged.
pub fn resolve_instructions(
    instructions: &[&str],
    detail_overrides: &[(usize, &str)],
    default_mode: OutputMode,
    mode: OutputMode,
) -> String {
    if mode != OutputMode::Default {
        debug!(
            mode = %mode,
            "Changing output mode from default deviates from the published instrument"
        );
    }

    let resolved = mode.resolve(default_mode);
    instructions
        .iter()
        .enumerate()
        .filter_map(|(ix, line)| {
            if resolved != OutputMode::Explanation {
                return Some(*line);
            }
            match detail_overrides.iter().find(|(at, _)| *at == ix) {
                Some((_, "")) => None,
                Some((_, replacement)) => Some(*replacement),
                None => Some(*line),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
