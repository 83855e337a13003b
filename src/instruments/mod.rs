//! Grading instruments.
//!
//! An instrument turns a summary and its source notes into the message
//! array sent to a grading model.

pub mod pdsqi;

use thiserror::Error;

/// Invalid inputs to a prompt resolver. Raised before any model call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Per-note metadata does not line up with the notes.
    #[error("notes and timestamps must be parallel lists ({notes} notes, {timestamps} timestamps)")]
    LengthMismatch { notes: usize, timestamps: usize },
}
