//! Batch tally and the human-readable summary printed at the end of a run.

use crate::config::ErrorOrder;
use crate::task::TaskOutcome;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Final tally of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Files dispatched.
    pub total: usize,
    /// Successful files, skipped ones included.
    pub ok: usize,
    pub failed: usize,
    /// Subset of `ok` whose output already existed.
    pub skipped: usize,
    /// `(file_name, message)` for every failure.
    pub errors: Vec<(String, String)>,
    pub duration_ms: u64,
}

impl BatchReport {
    /// Fold one outcome into the tally.
    pub fn record(&mut self, outcome: TaskOutcome) {
        self.total += 1;
        if outcome.success {
            self.ok += 1;
            if outcome.is_skipped() {
                self.skipped += 1;
            }
        } else {
            self.failed += 1;
            self.errors.push((outcome.file_name, outcome.message));
        }
    }

    /// Reorder the error list. Completion order is the order of `record` calls.
    pub fn order_errors(&mut self, order: ErrorOrder) {
        if order == ErrorOrder::Alphabetical {
            self.errors.sort_by(|a, b| a.0.cmp(&b.0));
        }
    }

    /// `Done. OK: <n>, Failed: <n>`
    pub fn summary_line(&self) -> String {
        format!("Done. OK: {}, Failed: {}", self.ok, self.failed)
    }

    /// Summary line followed by one `--- <file> ---` block per failure.
    pub fn render_summary(&self) -> String {
        let mut out = self.summary_line();
        if !self.errors.is_empty() {
            out.push_str("\n\nErrors:");
            for (file, message) in &self.errors {
                let _ = write!(out, "\n--- {file} ---\n{}", message.trim_end());
            }
        }
        out
    }
}
