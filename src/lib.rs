//! # pdf2md-batch
//!
//! Convert a directory of PDF documents to Markdown (or plain text) with a
//! bounded pool of workers.
//!
//! ## Why this crate?
//!
//! Large PDF collections always contain a few documents that break the
//! extractor: corrupt cross-reference tables, exotic fonts, images that make
//! the native library abort. This crate keeps those failures contained. Each
//! file runs as an isolated task, extraction falls back from layout-aware
//! Markdown to a page-by-page pass, and the batch finishes with a tally and
//! an itemised error list instead of dying on the first bad file.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input dir
//!  │
//!  ├─ 1. List      *.pdf, sorted, one Task each
//!  ├─ 2. Dispatch  ThreadRunner or ProcessRunner, `workers` in flight
//!  ├─ 3. Extract   layout Markdown → page-wise Markdown (or plain text)
//!  ├─ 4. Tables    lattice → stream → per-page scan, appended as Markdown
//!  ├─ 5. Polish    whitespace, blank lines, hyphenation
//!  ├─ 6. Write     <stem>.md / <stem>.txt, atomically
//!  └─ 7. Report    Done. OK: n, Failed: n  + one block per failure
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2md_batch::{run_batch, BatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BatchConfig::builder("data", "extracted").workers(8).build()?;
//!     let report = run_batch(&config).await?;
//!     println!("{}", report.render_summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2md-batch` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2md-batch = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! The library binds to pdfium at run time. Set `PDFIUM_LIB_PATH` to the
//! directory holding `libpdfium`; otherwise the current directory and then
//! the system library path are tried.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod task;
pub mod worker;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::Collaborators;
pub use batch::{batch_stream, plan_tasks, run_batch, run_batch_sync, OutcomeStream};
pub use config::{BatchConfig, BatchConfigBuilder, ErrorOrder, OutputFormat, PageSelection, TaskOptions};
pub use error::{BatchError, ExtractError};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::BatchReport;
pub use task::{process_file, Task, TaskOutcome};
pub use worker::{run_worker_task, ProcessRunner, TaskRunner, ThreadRunner, WORKER_FLAG};
