//! Rubric data table.
//!
//! A rubric set is data, not code: an ordered list of named criteria, each
//! with a description, optional grading notes and its own grading scale.
//! Scales differ per metric (1-5 Likert, 0/1, `NA` plus 1-5, `YES`/`NO`)
//! and are kept as written rather than forced into one integer range.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::response::{Grade, GradeValue, Grades};

/// Errors raised while loading a rubric table.
#[derive(Error, Debug)]
pub enum RubricError {
    /// IO error reading a rubric file.
    #[error("failed to read rubric table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The table is not valid TOML or does not match the rubric schema.
    #[error("invalid rubric table: {0}")]
    Parse(#[from] toml::de::Error),

    /// Two rubrics share an id.
    #[error("duplicate rubric id `{0}`")]
    DuplicateId(String),

    /// A rubric declares no grade levels.
    #[error("rubric `{0}` has an empty grading scale")]
    EmptyScale(String),

    /// None of the requested rubric keys are in the table.
    #[error("no rubrics selected (requested: {})", requested.join(", "))]
    EmptySelection { requested: Vec<String> },
}

pub type RubricResult<T> = Result<T, RubricError>;

/// One level of a grading scale, e.g. `5 = All assertions can be traced`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeLevel {
    /// Grade as the model must emit it (`"1"`, `"NA"`, `"YES"`).
    pub value: String,
    pub text: String,
}

impl GradeLevel {
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
        }
    }
}

/// Shape of a grading scale, derived from its levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleType {
    /// Exactly the integers 0 and 1.
    Binary,
    /// Integers only.
    Likert,
    /// Integers plus a `NA` level.
    LikertWithNa,
    /// Anything else (e.g. `YES`/`NO`).
    Categorical,
}

/// Ordered grade levels for one rubric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GradeScale {
    levels: Vec<GradeLevel>,
}

impl GradeScale {
    pub fn new(levels: Vec<GradeLevel>) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> &[GradeLevel] {
        &self.levels
    }

    pub fn scale_type(&self) -> ScaleType {
        let is_integer = |level: &GradeLevel| level.value.trim().parse::<i64>().is_ok();
        let is_na = |level: &GradeLevel| level.value.trim().eq_ignore_ascii_case("NA");

        if self.levels.iter().all(is_integer) {
            let values: HashSet<&str> = self.levels.iter().map(|l| l.value.trim()).collect();
            if values == HashSet::from(["0", "1"]) {
                ScaleType::Binary
            } else {
                ScaleType::Likert
            }
        } else if self.levels.iter().all(|l| is_integer(l) || is_na(l))
            && self.levels.iter().any(is_na)
        {
            ScaleType::LikertWithNa
        } else {
            ScaleType::Categorical
        }
    }

    /// Whether a reported grade is one of this scale's levels.
    pub fn accepts(&self, value: &GradeValue) -> bool {
        let reported = value.to_string();
        self.levels
            .iter()
            .any(|level| level.value.trim().eq_ignore_ascii_case(reported.trim()))
    }
}

/// A named grading criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    /// Lowercase metric identifier, also the key of the grade JSON.
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(rename = "grades")]
    pub scale: GradeScale,
}

impl Rubric {
    /// Render as a tagged block for inclusion in a prompt.
    pub fn render(&self) -> String {
        let mut block = format!("<{}>\nDESCRIPTION: {}\n", self.id, self.description.trim_end());
        for note in &self.notes {
            block.push_str("NOTE: ");
            block.push_str(note.trim_end());
            block.push('\n');
        }
        block.push_str("\nGRADES:\n");
        for level in self.scale.levels() {
            block.push_str(&format!("{} = {}\n", level.value, level.text));
        }
        block.push_str(&format!("<\\{}>", self.id));
        block
    }
}

/// Problem found when checking a model's grades against a rubric set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeIssue {
    /// A rubric metric has no grade.
    Missing { metric: String },
    /// The grade is neither a bare value nor `{explanation, score}`.
    Malformed { metric: String },
    /// The grade is not a level of the metric's scale.
    OutOfScale { metric: String, value: String },
    /// The response graded a metric that is not in the rubric set.
    Unexpected { metric: String },
}

#[derive(Debug, Deserialize)]
struct RubricTable {
    rubrics: Vec<Rubric>,
}

/// Ordered set of rubrics with unique ids.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RubricSet {
    rubrics: Vec<Rubric>,
}

impl RubricSet {
    pub fn new(rubrics: Vec<Rubric>) -> RubricResult<Self> {
        let mut seen = HashSet::new();
        for rubric in &rubrics {
            if !seen.insert(rubric.id.as_str()) {
                return Err(RubricError::DuplicateId(rubric.id.clone()));
            }
            if rubric.scale.levels().is_empty() {
                return Err(RubricError::EmptyScale(rubric.id.clone()));
            }
        }
        Ok(Self { rubrics })
    }

    /// Parse a TOML table of `[[rubrics]]` entries.
    pub fn from_toml_str(text: &str) -> RubricResult<Self> {
        let table: RubricTable = toml::from_str(text)?;
        Self::new(table.rubrics)
    }

    pub fn from_path(path: impl AsRef<Path>) -> RubricResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RubricError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn get(&self, id: &str) -> Option<&Rubric> {
        self.rubrics.iter().find(|rubric| rubric.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rubrics.iter().map(|rubric| rubric.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rubric> {
        self.rubrics.iter()
    }

    pub fn len(&self) -> usize {
        self.rubrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rubrics.is_empty()
    }

    /// Subset in the requested order, plus the keys that were not found.
    pub fn select(&self, keys: &[&str]) -> (RubricSet, Vec<String>) {
        let mut selected = Vec::new();
        let mut unknown = Vec::new();
        for key in keys {
            match self.get(key) {
                Some(rubric) if !selected.iter().any(|r: &Rubric| r.id == rubric.id) => {
                    selected.push(rubric.clone())
                }
                Some(_) => {}
                None => unknown.push((*key).to_string()),
            }
        }
        (RubricSet { rubrics: selected }, unknown)
    }

    /// Render every rubric block, separated by blank lines.
    pub fn render(&self) -> String {
        self.rubrics
            .iter()
            .map(Rubric::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Check a parsed grade map against this rubric set.
    pub fn check_grades(&self, grades: &Grades) -> Vec<GradeIssue> {
        let mut issues = Vec::new();

        for rubric in &self.rubrics {
            let Some(value) = grades.get(&rubric.id) else {
                issues.push(GradeIssue::Missing {
                    metric: rubric.id.clone(),
                });
                continue;
            };
            match Grade::from_value(value) {
                Some(grade) if rubric.scale.accepts(grade.score()) => {}
                Some(grade) => issues.push(GradeIssue::OutOfScale {
                    metric: rubric.id.clone(),
                    value: grade.score().to_string(),
                }),
                None => issues.push(GradeIssue::Malformed {
                    metric: rubric.id.clone(),
                }),
            }
        }

        for metric in grades.keys() {
            if self.get(metric).is_none() {
                issues.push(GradeIssue::Unexpected {
                    metric: metric.clone(),
                });
            }
        }

        issues
    }
}
