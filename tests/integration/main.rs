//! Integration tests driving whole evaluation runs.

mod prompt_resolution;
mod run_dataset;

/// Route library events to the test harness (visible with `--nocapture`).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("evaluation_instruments=debug"))
        .with_test_writer()
        .try_init();
}
