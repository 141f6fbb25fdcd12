//! Task runners: where a [`Task`] actually executes.
//!
//! | Runner | Isolation | Parallelism |
//! |--------|-----------|-------------|
//! | [`ThreadRunner`] | panics only | limited by pdfium's global lock |
//! | [`ProcessRunner`] | panics, aborts, segfaults | one pdfium per process |
//!
//! pdfium serialises calls inside one process (`thread_safe` feature), so the
//! thread runner mostly overlaps I/O. The process runner re-executes the
//! binary in worker mode, one child per task, and reads a single JSON
//! [`TaskOutcome`] from its stdout.

use crate::backend::Collaborators;
use crate::error::ExtractError;
use crate::pipeline::writer::escape_invalid_utf8;
use crate::task::{process_file, Task, TaskOutcome};
use futures::future::{BoxFuture, FutureExt};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tracing::{debug, warn};

/// Command-line flag that switches the binary into worker mode.
pub const WORKER_FLAG: &str = "--worker-task";

/// Executes one task and reports its outcome. Never fails.
pub trait TaskRunner: Send + Sync {
    fn run(&self, task: Task) -> BoxFuture<'static, TaskOutcome>;
}

// ── Threads ──────────────────────────────────────────────────────────────────

/// Runs [`process_file`] on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct ThreadRunner {
    collaborators: Collaborators,
}

impl ThreadRunner {
    pub fn new(collaborators: Collaborators) -> Self {
        Self { collaborators }
    }

    /// Thread runner over the pdfium backend.
    pub fn pdfium() -> Self {
        Self::new(Collaborators::pdfium())
    }
}

impl TaskRunner for ThreadRunner {
    fn run(&self, task: Task) -> BoxFuture<'static, TaskOutcome> {
        let collaborators = self.collaborators.clone();
        async move {
            let file_name = task.file_name.clone();
            tokio::task::spawn_blocking(move || process_file(&task, &collaborators))
                .await
                .unwrap_or_else(|e| {
                    let error = if e.is_panic() {
                        ExtractError::from_panic(e.into_panic().as_ref())
                    } else {
                        ExtractError::WorkerCrashed {
                            file: file_name.clone(),
                            status: "cancelled".into(),
                            stderr: e.to_string(),
                        }
                    };
                    TaskOutcome::failed(file_name, &error)
                })
        }
        .boxed()
    }
}

// ── Processes ────────────────────────────────────────────────────────────────

/// Runs each task in a child process: `<program> <args…> --worker-task <json>`.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Re-execute the running binary.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Extra argument placed before the worker flag.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl TaskRunner for ProcessRunner {
    fn run(&self, task: Task) -> BoxFuture<'static, TaskOutcome> {
        let program = self.program.clone();
        let args = self.args.clone();
        async move {
            let file_name = task.file_name.clone();
            match run_child(program, args, &task).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!("Worker for {file_name} failed: {error}");
                    TaskOutcome::failed(file_name, &error)
                }
            }
        }
        .boxed()
    }
}

async fn run_child(
    program: PathBuf,
    args: Vec<OsString>,
    task: &Task,
) -> Result<TaskOutcome, ExtractError> {
    let crashed = |status: String, stderr: String| ExtractError::WorkerCrashed {
        file: task.file_name.clone(),
        status,
        stderr,
    };

    let payload = serde_json::to_string(task)
        .map_err(|e| crashed("task not serialisable".into(), e.to_string()))?;

    debug!("Spawning worker {} for {}", program.display(), task.file_name);
    let output = tokio::process::Command::new(&program)
        .args(&args)
        .arg(WORKER_FLAG)
        .arg(payload)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| crashed(format!("spawn failed: {e}"), String::new()))?;

    let stderr = escape_invalid_utf8(&output.stderr).trim_end().to_string();
    if !output.status.success() {
        return Err(crashed(output.status.to_string(), stderr));
    }

    let stdout = escape_invalid_utf8(&output.stdout);
    let last_line = stdout.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
    serde_json::from_str::<TaskOutcome>(last_line)
        .map_err(|e| crashed(format!("{}, unreadable outcome ({e})", output.status), stderr))
}

/// Worker-mode entry point: decode a task from JSON and run it in-process.
pub fn run_worker_task(
    task_json: &str,
    collaborators: &Collaborators,
) -> Result<TaskOutcome, serde_json::Error> {
    let task: Task = serde_json::from_str(task_json)?;
    Ok(process_file(&task, collaborators))
}
