//! One file, end to end: skip check, extraction, tables, normalisation, write.
//!
//! [`process_file`] never returns an error. Whatever goes wrong (including a
//! panic inside a collaborator) is folded into a failed [`TaskOutcome`] so
//! that one bad document cannot take down the batch.

use crate::backend::Collaborators;
use crate::config::{OutputFormat, TaskOptions};
use crate::error::ExtractError;
use crate::pipeline::normalize::normalize;
use crate::pipeline::strategy::StrategyChain;
use crate::pipeline::tables::{append_tables, extract_tables};
use crate::pipeline::writer::write_text;
use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::error::Error as _;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Message of a successful outcome whose output already existed.
pub const SKIPPED: &str = "skipped";

/// Everything a worker needs to convert one PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// File name relative to `input_dir`, e.g. `report.pdf`.
    pub file_name: String,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub skip_existing: bool,
    pub options: TaskOptions,
}

impl Task {
    pub fn input_path(&self) -> PathBuf {
        self.input_dir.join(&self.file_name)
    }

    /// `<output_dir>/<stem>.<md|txt>`
    pub fn output_path(&self) -> PathBuf {
        let stem = Path::new(&self.file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_name.clone());
        self.output_dir
            .join(format!("{stem}.{}", self.options.format.extension()))
    }
}

/// Result of one task, as reported to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub file_name: String,
    pub success: bool,
    /// Empty on success, [`SKIPPED`] for skipped files, otherwise
    /// `"<ErrorKind>: <message>\n<backtrace>"`.
    pub message: String,
}

impl TaskOutcome {
    pub fn ok(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            success: true,
            message: String::new(),
        }
    }

    pub fn skipped(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            success: true,
            message: SKIPPED.to_string(),
        }
    }

    pub fn failed(file_name: impl Into<String>, error: &ExtractError) -> Self {
        Self {
            file_name: file_name.into(),
            success: false,
            message: failure_message(error),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.success && self.message == SKIPPED
    }
}

/// `"<Kind>: <error>: <source>: …\n<backtrace>"`
pub fn failure_message(error: &ExtractError) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    format!("{}: {text}\n{}", error.kind(), Backtrace::force_capture())
}

/// Convert one PDF. Safe to call concurrently for different tasks.
pub fn process_file(task: &Task, collaborators: &Collaborators) -> TaskOutcome {
    let output = task.output_path();
    if task.skip_existing && output.exists() {
        debug!("Skipping {}: {} exists", task.file_name, output.display());
        return TaskOutcome::skipped(&task.file_name);
    }

    let result = catch_unwind(AssertUnwindSafe(|| convert(task, collaborators, &output)))
        .unwrap_or_else(|payload| Err(ExtractError::from_panic(payload.as_ref())));

    match result {
        Ok(()) => {
            debug!("Converted {} → {}", task.file_name, output.display());
            TaskOutcome::ok(&task.file_name)
        }
        Err(e) => {
            warn!("Failed {}: {e}", task.file_name);
            TaskOutcome::failed(&task.file_name, &e)
        }
    }
}

fn convert(task: &Task, collaborators: &Collaborators, output: &Path) -> Result<(), ExtractError> {
    let input = task.input_path();
    let options = &task.options;

    let chain = StrategyChain::for_format(
        options.format,
        collaborators.converter.clone(),
        collaborators.documents.clone(),
    );
    let mut text = chain.run(&input)?;

    if options.format == OutputFormat::Markdown && options.extract_tables {
        let tables = extract_tables(
            &input,
            &options.table_pages,
            collaborators.detector.as_ref(),
            collaborators.scanner.as_ref(),
        )?;
        text = append_tables(&text, &tables);
    }

    let text = normalize(&text, options.dehyphenate);
    write_text(output, &text, options.atomic_writes)
}
