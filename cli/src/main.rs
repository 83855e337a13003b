//! evalinst: grade clinical-note summaries from the command line.

mod commands;
mod replay;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use evaluation_instruments::prompt::OutputMode;
use tracing_subscriber::EnvFilter;

/// Grade clinical-note summaries with the PDSQI-9 instrument
#[derive(Parser, Debug)]
#[command(name = "evalinst", version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to <config dir>/evaluation-instruments/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resolved messages for one sample file
    Prompt {
        /// Sample file with `summary`, `notes` and optional `timestamps`
        sample: PathBuf,

        /// default, score or explanation
        #[arg(long)]
        output_mode: Option<OutputMode>,

        /// Leave out the system message
        #[arg(long)]
        no_system: bool,
    },
    /// Grade a dataset, replaying model responses from a run log
    Run {
        /// Dataset rows (JSON array or JSON Lines), each with a `guid`
        #[arg(long)]
        dataset: PathBuf,

        /// Directory holding `<guid>.json` sample files
        #[arg(long)]
        data_dir: PathBuf,

        /// Run log whose `raw_content` is replayed per `sample_ix`
        #[arg(long)]
        responses: PathBuf,

        /// Token cap for this run (0 = unlimited)
        #[arg(long)]
        max_tokens: Option<u64>,

        /// Model name passed to the completion function
        #[arg(long)]
        model: Option<String>,

        /// default, score or explanation
        #[arg(long)]
        output_mode: Option<OutputMode>,

        /// Do not write a raw-content log for this run
        #[arg(long)]
        no_log: bool,
    },
    /// Delete run logs older than the retention window
    PruneLogs {
        /// Override the configured retention (0 keeps everything)
        #[arg(long)]
        retention_days: Option<u64>,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Prompt {
            sample,
            output_mode,
            no_system,
        } => commands::prompt(&config, &sample, output_mode, no_system),
        Commands::Run {
            dataset,
            data_dir,
            responses,
            max_tokens,
            model,
            output_mode,
            no_log,
        } => commands::run(
            config,
            commands::RunArgs {
                dataset,
                data_dir,
                responses,
                max_tokens,
                model,
                output_mode,
                no_log,
            },
        ),
        Commands::PruneLogs { retention_days } => commands::prune_logs(&config, retention_days),
    }
}
