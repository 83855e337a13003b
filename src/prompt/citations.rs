//! Note citations inside a summary.
//!
//! Summaries cite their source notes as `<Note ID:3>` (the form the rubric
//! asks for) or `<NoteID:3>` (the form the notes themselves are tagged
//! with). Both are accepted here.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

fn citation_regex() -> &'static Regex {
    static CITATION: OnceLock<Regex> = OnceLock::new();
    CITATION.get_or_init(|| {
        Regex::new(r"<\s*Note\s*ID\s*:\s*(\d+)\s*>").expect("citation pattern is valid")
    })
}

/// Every note id cited in `summary`, in order of appearance, with repeats.
pub fn cited_note_ids(summary: &str) -> Vec<usize> {
    citation_regex()
        .captures_iter(summary)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Cited ids that do not name one of `note_count` notes (ids are 1-based).
pub fn dangling_citations(summary: &str, note_count: usize) -> BTreeSet<usize> {
    cited_note_ids(summary)
        .into_iter()
        .filter(|id| *id == 0 || *id > note_count)
        .collect()
}
