use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parsed grade JSON: metric name to grade, in response order.
pub type Grades = serde_json::Map<String, Value>;

/// A single reported grade: an integer or a label such as `NA` or `YES`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GradeValue {
    Integer(i64),
    Label(String),
}

impl GradeValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            GradeValue::Integer(value) => Some(*value),
            GradeValue::Label(label) => label.trim().parse().ok(),
        }
    }
}

impl fmt::Display for GradeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeValue::Integer(value) => write!(f, "{value}"),
            GradeValue::Label(label) => f.write_str(label),
        }
    }
}

/// Typed view of one metric's grade.
///
/// Score-only responses carry a bare value; explained responses carry
/// `{"explanation": ..., "score": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Grade {
    Score(GradeValue),
    Explained {
        explanation: String,
        score: GradeValue,
    },
}

impl Grade {
    /// Interpret a raw grade value, `None` if it has neither shape.
    pub fn from_value(value: &Value) -> Option<Grade> {
        serde_json::from_value(value.clone()).ok()
    }

    pub fn score(&self) -> &GradeValue {
        match self {
            Grade::Score(score) | Grade::Explained { score, .. } => score,
        }
    }

    pub fn explanation(&self) -> Option<&str> {
        match self {
            Grade::Score(_) => None,
            Grade::Explained { explanation, .. } => Some(explanation),
        }
    }
}
