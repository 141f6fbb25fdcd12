//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive events
//! as files finish. The orchestrator is the only consumer of worker
//! outcomes, so callbacks fire from a single task, one at a time, in
//! completion order.
//!
//! # Example
//!
//! ```rust
//! use pdf2md_batch::{BatchConfig, BatchProgressCallback, TaskOutcome};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     failed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, outcome: &TaskOutcome, done: usize, total: usize) {
//!         if !outcome.success {
//!             self.failed.fetch_add(1, Ordering::SeqCst);
//!         }
//!         eprintln!("{done}/{total} {}", outcome.file_name);
//!     }
//! }
//!
//! let config = BatchConfig::builder("data", "extracted")
//!     .progress_callback(Arc::new(CountingCallback { failed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::report::BatchReport;
use crate::task::TaskOutcome;
use std::sync::Arc;

/// Called by the orchestrator as the batch progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after the input directory has been listed.
    ///
    /// # Arguments
    /// * `total_files`: number of PDFs that will be dispatched
    /// * `workers`: size of the worker pool
    fn on_batch_start(&self, total_files: usize, workers: usize) {
        let _ = (total_files, workers);
    }

    /// Called for every outcome, in completion order.
    ///
    /// # Arguments
    /// * `outcome`: the finished task
    /// * `done`: outcomes received so far, including this one
    /// * `total`: total files in the batch
    fn on_file_complete(&self, outcome: &TaskOutcome, done: usize, total: usize) {
        let _ = (outcome, done, total);
    }

    /// Called once with the final tally.
    fn on_batch_complete(&self, report: &BatchReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        completes: AtomicUsize,
        failures: AtomicUsize,
        final_ok: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_batch_start(&self, total_files: usize, _workers: usize) {
            self.started_total.store(total_files, Ordering::SeqCst);
        }

        fn on_file_complete(&self, outcome: &TaskOutcome, _done: usize, _total: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            if !outcome.success {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_batch_complete(&self, report: &BatchReport) {
            self.final_ok.store(report.ok, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(3, 2);
        cb.on_file_complete(&TaskOutcome::ok("a.pdf"), 1, 3);
        cb.on_batch_complete(&BatchReport::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_batch_start(2, 10);
        tracker.on_file_complete(&TaskOutcome::ok("a.pdf"), 1, 2);
        tracker.on_file_complete(
            &TaskOutcome {
                file_name: "b.pdf".into(),
                success: false,
                message: "OpenFailed: bad".into(),
            },
            2,
            2,
        );
        tracker.on_batch_complete(&BatchReport {
            total: 2,
            ok: 1,
            failed: 1,
            ..BatchReport::default()
        });

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.final_ok.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(10, 4);
    }
}
