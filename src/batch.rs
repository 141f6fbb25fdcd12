//! Batch orchestration: list the input directory, fan tasks out to a bounded
//! pool of runners, and fold the outcomes into a [`BatchReport`].
//!
//! Two entry points share the same plumbing:
//!
//! * [`run_batch`] drains everything and returns the final tally.
//! * [`batch_stream`] hands the completion stream to the caller, who can
//!   react to each [`TaskOutcome`] as it arrives.

use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::pipeline::input;
use crate::report::BatchReport;
use crate::task::{Task, TaskOutcome};
use crate::worker::{TaskRunner, ThreadRunner};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::{debug, info};

/// Outcomes in completion order.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = TaskOutcome> + Send>>;

/// Resolve both directories and build one [`Task`] per PDF, sorted by name.
///
/// Creates the output directory if it does not exist.
pub fn plan_tasks(config: &BatchConfig) -> Result<Vec<Task>, BatchError> {
    let input_dir = input::resolve_input_dir(&config.input_dir)?;
    let output_dir = input::prepare_output_dir(&config.output_dir)?;
    let names = input::list_pdfs(&input_dir)?;
    debug!("Listed {} PDFs in {}", names.len(), input_dir.display());

    Ok(names
        .into_iter()
        .map(|file_name| Task {
            file_name,
            input_dir: input_dir.clone(),
            output_dir: output_dir.clone(),
            skip_existing: config.skip_existing,
            options: config.task.clone(),
        })
        .collect())
}

/// Run `tasks` with at most `config.workers` in flight.
///
/// Submission order is the order of `tasks`; the stream yields in whatever
/// order runners finish.
pub fn batch_stream(config: &BatchConfig, tasks: Vec<Task>) -> OutcomeStream {
    let runner: Arc<dyn TaskRunner> = match config.runner {
        Some(ref r) => Arc::clone(r),
        None => Arc::new(ThreadRunner::pdfium()),
    };
    let workers = config.workers.max(1);

    Box::pin(
        stream::iter(tasks)
            .map(move |task| runner.run(task))
            .buffer_unordered(workers),
    )
}

/// Convert every PDF in `config.input_dir`.
///
/// # Returns
/// The tally, even if every file failed. Per-file failures are listed in
/// [`BatchReport::errors`].
///
/// # Errors
/// Only batch-level problems: missing or unreadable input directory, or an
/// output directory that cannot be created.
pub async fn run_batch(config: &BatchConfig) -> Result<BatchReport, BatchError> {
    let start = Instant::now();
    let tasks = plan_tasks(config)?;
    let total = tasks.len();

    let mut report = BatchReport::default();
    if total == 0 {
        info!("No PDF files found.");
        report.duration_ms = start.elapsed().as_millis() as u64;
        if let Some(ref cb) = config.progress_callback {
            cb.on_batch_complete(&report);
        }
        return Ok(report);
    }

    info!("Found {} PDFs", total);
    info!("Using {} workers", config.workers);
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total, config.workers);
    }

    let mut outcomes = batch_stream(config, tasks);
    let mut done = 0;
    while let Some(outcome) = outcomes.next().await {
        done += 1;
        if let Some(ref cb) = config.progress_callback {
            cb.on_file_complete(&outcome, done, total);
        }
        report.record(outcome);
    }

    report.order_errors(config.error_order);
    report.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Batch complete: {} ok ({} skipped), {} failed, {}ms",
        report.ok, report.skipped, report.failed, report.duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(&report);
    }
    Ok(report)
}

/// Synchronous wrapper around [`run_batch`].
///
/// Creates a temporary tokio runtime internally; do not call from inside one.
pub fn run_batch_sync(config: &BatchConfig) -> Result<BatchReport, BatchError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BatchError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run_batch(config))
}
