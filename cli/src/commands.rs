use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use evaluation_instruments::budget::TokenEstimator;
use evaluation_instruments::data::{Dataset, SummaryRecord};
use evaluation_instruments::evaluation::{Evaluation, RunEvent, RunStatus};
use evaluation_instruments::instruments::pdsqi::{pdsqi_from_dir, Pdsqi, PdsqiOptions};
use evaluation_instruments::prompt::OutputMode;
use evaluation_instruments::runlog::RunLogStore;
use evaluation_instruments::EvaluationConfig;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::{debug, warn};

use crate::replay::Replay;

const CONFIG_DIR_NAME: &str = "evaluation-instruments";
const CONFIG_FILE_NAME: &str = "config.toml";

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// An explicit path must exist; the default path is used only if present.
pub fn load_config(path: Option<&Path>) -> Result<EvaluationConfig> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|path| path.is_file()),
    };
    debug!(path = ?path, "Loading configuration");
    EvaluationConfig::load(path.as_deref()).context("failed to load configuration")
}

fn pdsqi_options(config: &EvaluationConfig, output_mode: Option<OutputMode>) -> PdsqiOptions {
    PdsqiOptions::default().with_output_mode(output_mode.unwrap_or(config.output_mode))
}

pub fn prompt(
    config: &EvaluationConfig,
    sample: &Path,
    output_mode: Option<OutputMode>,
    no_system: bool,
) -> Result<()> {
    let text = fs::read_to_string(sample)
        .with_context(|| format!("failed to read {}", sample.display()))?;
    let record: SummaryRecord = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a summary record", sample.display()))?;

    let mut options = pdsqi_options(config, output_mode);
    if no_system {
        options = options.without_system_message();
    }
    let messages = Pdsqi::new(options)?.resolve_record(&record)?;
    let estimated_tokens = TokenEstimator::default().estimate_messages(&messages);

    let output = json!({
        "messages": messages,
        "estimated_tokens": estimated_tokens,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[derive(Debug)]
pub struct RunArgs {
    pub dataset: PathBuf,
    pub data_dir: PathBuf,
    pub responses: PathBuf,
    pub max_tokens: Option<u64>,
    pub model: Option<String>,
    pub output_mode: Option<OutputMode>,
    pub no_log: bool,
}

pub fn run(mut config: EvaluationConfig, args: RunArgs) -> Result<()> {
    if let Some(max_tokens) = args.max_tokens {
        config = config.with_max_tokens(max_tokens);
    }
    if args.no_log {
        config = config.with_log_enabled(false);
    } else if config.log_enabled && is_in_dir(&args.responses, &config.run_log().log_dir) {
        // A run started in the same minute would append to its own input.
        warn!(
            responses = %args.responses.display(),
            "Responses are in the log directory, not logging"
        );
        eprintln!(
            "{} responses come from the log directory, skipping the run log",
            "note:".yellow()
        );
        config = config.with_log_enabled(false);
    }
    let model = args.model.or_else(|| config.model.clone());

    let dataset = Dataset::from_path(&args.dataset)
        .with_context(|| format!("failed to load dataset {}", args.dataset.display()))?;
    let replay = Replay::from_log(&args.responses)?;
    debug!(rows = dataset.len(), responses = replay.len(), "Replaying responses");

    let prep = pdsqi_from_dir(args.data_dir, pdsqi_options(&config, args.output_mode))?;
    let evaluation = config
        .configure(Evaluation::builder())
        .prep(replay.track(prep))
        .completion(replay.completion())
        .build()?;

    let progress = ProgressBar::new(dataset.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let outcome = evaluation.run_dataset_with_progress(&dataset, model.as_deref(), None, |event| {
        match event {
            RunEvent::RowStarted { .. } => {}
            RunEvent::RowCompleted { accumulated, .. } => {
                progress.inc(1);
                progress.set_message(format!("{} tokens", accumulated.total()));
            }
            RunEvent::RowSkipped { index, reason } => {
                progress.inc(1);
                progress.println(format!("{} row {index}: {reason}", "skipped".yellow()));
            }
            RunEvent::BudgetExceeded { .. } => progress.abandon(),
        }
    });
    progress.finish_and_clear();
    let outcome = outcome?;

    let graded = format!("{} rows graded", outcome.results.len());
    match outcome.status {
        RunStatus::Completed => eprintln!("{} {}", graded.green().bold(), outcome.usage),
        RunStatus::BudgetExceeded => eprintln!(
            "{} {} ({})",
            "budget exceeded:".red().bold(),
            graded,
            outcome.usage
        ),
    }
    if !outcome.skipped.is_empty() {
        eprintln!("{} {:?}", "skipped rows:".yellow(), outcome.skipped);
    }
    if let Some(path) = &outcome.log_path {
        eprintln!("{} {}", "raw content:".dimmed(), path.display());
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn is_in_dir(file: &Path, dir: &Path) -> bool {
    match (fs::canonicalize(file), fs::canonicalize(dir)) {
        (Ok(file), Ok(dir)) => file.parent() == Some(dir.as_path()),
        _ => false,
    }
}

pub fn prune_logs(config: &EvaluationConfig, retention_days: Option<u64>) -> Result<()> {
    let mut run_log = config.run_log();
    if let Some(days) = retention_days {
        run_log = run_log.with_retention_days(days);
    }
    let store = RunLogStore::new(&run_log);
    let removed = store
        .enforce_retention()
        .with_context(|| format!("failed to prune {}", store.log_dir().display()))?;

    println!(
        "Removed {} run log(s) from {}",
        removed.to_string().bold(),
        store.log_dir().display()
    );
    Ok(())
}
