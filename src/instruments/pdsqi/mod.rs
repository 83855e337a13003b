//! PDSQI-9: the Provider Documentation Summarization Quality Instrument.
//!
//! Nine attributes (plus the abstraction gate and two stigmatizing
//! language checks) graded by a model acting as a clinician reviewer.
//! The rubric table ships embedded as `rubrics.toml`; a different table can
//! be supplied with [`Pdsqi::with_rubrics`].
//!
//! # Example
//!
//! ```ignore
//! use evaluation_instruments::instruments::pdsqi::{Pdsqi, PdsqiOptions, PromptContext};
//!
//! let pdsqi = Pdsqi::new(PdsqiOptions::default())?;
//! let messages = pdsqi.resolve_prompt(
//!     "Admitted for CAP <Note ID:1>.",
//!     &["Patient admitted with community-acquired pneumonia."],
//!     &PromptContext::default().with_target_specialty("pulmonology"),
//! )?;
//! ```

mod prompt;

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::debug;

pub use prompt::{BASE_PROMPT_PATTERN, DEFAULT_OUTPUT_MODE, SYSTEM_PROMPT};

use super::InputError;
use crate::data::{JsonFileLoader, Sample, SummaryRecord};
use crate::prompt::{
    compile_prompt, dangling_citations, resolve_instructions, to_messages, Message, OutputMode,
    PromptTemplate, RubricResult, RubricSet,
};

const EMBEDDED_RUBRICS: &str = include_str!("rubrics.toml");

/// Column of a dataset row that names the sample's JSON file.
pub const FILE_KEY_COLUMN: &str = "guid";

/// The PDSQI-9 rubric table shipped with the crate.
pub fn default_rubrics() -> &'static RubricSet {
    static RUBRICS: OnceLock<RubricSet> = OnceLock::new();
    RUBRICS.get_or_init(|| {
        RubricSet::from_toml_str(EMBEDDED_RUBRICS).expect("embedded PDSQI-9 rubric table is valid")
    })
}

/// Per use case settings, fixed when the prompt is compiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdsqiOptions {
    pub output_mode: OutputMode,
    /// System message sent ahead of the prompt; `None` sends only the user message.
    pub system_message: Option<String>,
    /// Metrics to grade, in order. `None` grades all of them.
    pub rubric_keys: Option<Vec<String>>,
}

impl Default for PdsqiOptions {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::Default,
            system_message: Some(SYSTEM_PROMPT.to_string()),
            rubric_keys: None,
        }
    }
}

impl PdsqiOptions {
    pub fn with_output_mode(mut self, output_mode: OutputMode) -> Self {
        self.output_mode = output_mode;
        self
    }

    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }

    pub fn without_system_message(mut self) -> Self {
        self.system_message = None;
        self
    }

    pub fn with_rubric_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rubric_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }
}

/// Per sample context beyond the summary and notes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    /// One timestamp per note, in note order.
    pub timestamps: Option<Vec<String>>,
    pub target_specialty: Option<String>,
}

impl PromptContext {
    pub fn with_timestamps<I, S>(mut self, timestamps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.timestamps = Some(timestamps.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_target_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.target_specialty = Some(specialty.into());
        self
    }
}

/// A compiled PDSQI-9 prompt, ready to resolve per sample.
#[derive(Debug, Clone)]
pub struct Pdsqi {
    template: PromptTemplate,
    system_message: Option<String>,
}

impl Pdsqi {
    pub fn new(options: PdsqiOptions) -> RubricResult<Self> {
        Self::with_rubrics(default_rubrics(), options)
    }

    /// Compile against a caller-supplied rubric table.
    ///
    /// Fails with [`RubricError::EmptySelection`](crate::prompt::RubricError)
    /// when `options.rubric_keys` matches no rubric, since the prompt would
    /// otherwise ask for grades without describing any.
    pub fn with_rubrics(rubrics: &RubricSet, options: PdsqiOptions) -> RubricResult<Self> {
        let keys: Option<Vec<&str>> = options
            .rubric_keys
            .as_ref()
            .map(|keys| keys.iter().map(String::as_str).collect());
        let selected_ids: Vec<String> = match &keys {
            Some(keys) => rubrics.select(keys).0.ids().map(String::from).collect(),
            None => rubrics.ids().map(String::from).collect(),
        };

        let mut instructions: Vec<String> =
            prompt::INSTRUCTIONS.iter().map(|line| line.to_string()).collect();
        instructions.push(prompt::score_example_instruction(selected_ids.iter().map(String::as_str)));
        let explanation_example =
            prompt::explanation_example_instruction(selected_ids.iter().map(String::as_str));

        let overrides = [
            (1, prompt::EXPLANATION_SHAPE_INSTRUCTION),
            (3, ""),
            (prompt::EXAMPLE_INSTRUCTION_INDEX, explanation_example.as_str()),
        ];
        let lines: Vec<&str> = instructions.iter().map(String::as_str).collect();
        let instruction_set =
            resolve_instructions(&lines, &overrides, DEFAULT_OUTPUT_MODE, options.output_mode);

        let template = compile_prompt(
            &PromptTemplate::new(BASE_PROMPT_PATTERN),
            &[(prompt::INSTRUCTIONS_PLACEHOLDER, instruction_set.as_str())],
            rubrics,
            keys.as_deref(),
        )?;

        Ok(Self {
            template,
            system_message: options.system_message,
        })
    }

    /// The compiled template with only per-sample placeholders left.
    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Resolve the message array for one summary and its source notes.
    ///
    /// Fails with [`InputError::LengthMismatch`] when timestamps are given
    /// but do not pair up with the notes.
    pub fn resolve_prompt<N: AsRef<str>>(
        &self,
        summary: &str,
        notes: &[N],
        context: &PromptContext,
    ) -> Result<Vec<Message>, InputError> {
        if let Some(timestamps) = &context.timestamps {
            if timestamps.len() != notes.len() {
                return Err(InputError::LengthMismatch {
                    notes: notes.len(),
                    timestamps: timestamps.len(),
                });
            }
        }

        let dangling = dangling_citations(summary, notes.len());
        if !dangling.is_empty() {
            debug!(
                cited = ?dangling,
                notes = notes.len(),
                "Summary cites notes that were not provided"
            );
        }

        let prompt_notes = notes
            .iter()
            .enumerate()
            .map(|(i, note)| {
                let id = i + 1;
                let timestamp = context
                    .timestamps
                    .as_ref()
                    .map(|ts| format!("Timestamp: {}\n", ts[i]))
                    .unwrap_or_default();
                format!("<NoteID:{id}>\n{timestamp}Note: {}\n<\\NoteID:{id}>", note.as_ref())
            })
            .collect::<Vec<_>>()
            .join("\n");

        let specialty_clause = context
            .target_specialty
            .as_ref()
            .map(|specialty| format!(" for a clinician with specialty {specialty}"))
            .unwrap_or_default();

        let prompt = self.template.fill(&[
            (prompt::NOTES_PLACEHOLDER, prompt_notes.as_str()),
            (prompt::SUMMARY_PLACEHOLDER, summary),
            (prompt::SPECIALTY_PLACEHOLDER, specialty_clause.as_str()),
        ]);

        Ok(to_messages(
            self.system_message.as_deref(),
            prompt.into_string(),
        ))
    }

    /// Resolve from the contents of a per-sample summary file.
    pub fn resolve_record(&self, record: &SummaryRecord) -> Result<Vec<Message>, InputError> {
        let context = PromptContext {
            timestamps: record.timestamps.clone(),
            target_specialty: record.target_specialty.clone(),
        };
        self.resolve_prompt(&record.summary, &record.notes, &context)
    }
}

impl Default for Pdsqi {
    fn default() -> Self {
        Self::embedded(OutputMode::Default)
    }
}

impl Pdsqi {
    /// Every embedded rubric in the given output mode.
    fn embedded(output_mode: OutputMode) -> Self {
        Self::new(PdsqiOptions::default().with_output_mode(output_mode))
            .expect("embedded PDSQI-9 rubric table is not empty")
    }
}

/// Resolve one prompt with the embedded rubric table.
pub fn resolve_prompt<N: AsRef<str>>(
    summary: &str,
    notes: &[N],
    context: &PromptContext,
    output_mode: OutputMode,
) -> Result<Vec<Message>, InputError> {
    Pdsqi::embedded(output_mode).resolve_prompt(summary, notes, context)
}

/// A prep function reading each sample's summary file through `loader`.
pub fn pdsqi_from_file(
    loader: JsonFileLoader,
    pdsqi: Pdsqi,
) -> impl Fn(&Sample) -> crate::Result<Vec<Message>> {
    loader.then(move |record: SummaryRecord| -> crate::Result<Vec<Message>> {
        Ok(pdsqi.resolve_record(&record)?)
    })
}

/// [`pdsqi_from_file`] keyed by the `guid` column of each row.
///
/// The prompt is compiled up front, so a rubric selection that matches
/// nothing fails here rather than on the first row.
pub fn pdsqi_from_dir(
    dir: PathBuf,
    options: PdsqiOptions,
) -> crate::Result<impl Fn(&Sample) -> crate::Result<Vec<Message>>> {
    Ok(pdsqi_from_file(
        JsonFileLoader::from_column(FILE_KEY_COLUMN, Some(dir)),
        Pdsqi::new(options)?,
    ))
}
