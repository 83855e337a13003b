//! Completion function that answers from a previous run log.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use anyhow::Context;
use evaluation_instruments::data::Sample;
use evaluation_instruments::evaluation::{CompletionError, ModelArgs, Prep};
use evaluation_instruments::prompt::Message;
use evaluation_instruments::runlog::read_records;
use serde_json::Value;

/// Raw responses keyed by sample index.
///
/// The completion signature carries no row index, so the prep side records
/// which sample is in flight and the completion side looks it up.
#[derive(Debug, Clone, Default)]
pub struct Replay {
    responses: Rc<HashMap<usize, Value>>,
    current: Rc<Cell<Option<usize>>>,
}

impl Replay {
    pub fn from_log(path: &Path) -> anyhow::Result<Self> {
        let records = read_records(path)
            .with_context(|| format!("failed to read responses from {}", path.display()))?;
        let responses = records
            .into_iter()
            .map(|record| (record.sample_ix, record.raw_content))
            .collect();
        Ok(Self {
            responses: Rc::new(responses),
            current: Rc::default(),
        })
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Wrap a prep function so the replay knows the current sample.
    pub fn track<P>(&self, prep: P) -> impl Fn(&Sample) -> evaluation_instruments::Result<Vec<Message>>
    where
        P: Prep + 'static,
    {
        let current = Rc::clone(&self.current);
        move |sample: &Sample| {
            current.set(Some(sample.index));
            prep.prepare(sample)
        }
    }

    pub fn completion(
        &self,
    ) -> impl Fn(Option<&str>, &[Message], &ModelArgs) -> Result<Value, CompletionError> {
        let responses = Rc::clone(&self.responses);
        let current = Rc::clone(&self.current);
        move |_model: Option<&str>,
              _messages: &[Message],
              _args: &ModelArgs|
              -> Result<Value, CompletionError> {
            let index = current
                .get()
                .ok_or_else(|| CompletionError::new("no sample in flight"))?;
            responses
                .get(&index)
                .cloned()
                .ok_or_else(|| CompletionError::new(format!("no logged response for sample {index}")))
        }
    }
}
