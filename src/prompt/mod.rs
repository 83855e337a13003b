//! Prompt building blocks shared by instruments.
//!
//! - [`Message`]/[`Role`]: the `{role, content}` array handed to a model
//! - [`RubricSet`]: rubric data table with per-metric grading scales
//! - [`PromptTemplate`] and [`compile_prompt`]: two-pass placeholder filling
//! - [`OutputMode`] and [`resolve_instructions`]: score-only vs explained grades
//! - [`cited_note_ids`]: citation scanning of summaries

mod citations;
mod instructions;
mod message;
mod rubric;
mod template;

pub use citations::{cited_note_ids, dangling_citations};
pub use instructions::{resolve_instructions, OutputMode, ParseOutputModeError};
pub use message::{to_messages, Message, Role};
pub use rubric::{
    GradeIssue, GradeLevel, GradeScale, Rubric, RubricError, RubricResult, RubricSet, ScaleType,
};
pub use template::{compile_prompt, PromptTemplate, RUBRIC_SET_PLACEHOLDER};
