//! Error types for the pdf2md-batch library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BatchError`]: **Fatal**, the batch cannot run at all (input
//!   directory missing, output directory cannot be created, bad config).
//!   Returned as `Err(BatchError)` from [`crate::batch::run_batch`].
//!
//! * [`ExtractError`]: **Non-fatal**, one document (or one table tier, or
//!   one page) failed. It never leaves the task runner as an `Err`; it is
//!   rendered into the failure message of a [`crate::task::TaskOutcome`]
//!   and the batch moves on to the next file.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the batch orchestrator.
///
/// Per-document failures use [`ExtractError`] and are reported in
/// [`crate::report::BatchReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum BatchError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input directory was not found at the given path.
    #[error("Input directory not found: '{path}'\nCheck the path exists and is a directory.")]
    InputDirNotFound { path: PathBuf },

    /// Input directory exists but could not be listed.
    #[error("Cannot read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the output directory (or one of its parents).
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document, page or table tier.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH to the directory containing libpdfium, or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    /// The document could not be opened (corrupt, encrypted, not a PDF).
    #[error("Cannot open PDF '{path}': {detail}")]
    OpenFailed { path: PathBuf, detail: String },

    /// A single page could not be read.
    #[error("Page {page}: {detail}")]
    PageFailed { page: usize, detail: String },

    /// The layout-aware converter gave up on the document.
    #[error("Layout conversion failed: {0}")]
    ConversionFailed(String),

    /// A table detector or scanner failed.
    #[error("Table detection ({tier}) failed: {detail}")]
    TableDetectionFailed { tier: &'static str, detail: String },

    /// A collaborator panicked; the payload message is kept.
    #[error("Extraction panicked: {0}")]
    Panic(String),

    /// Every strategy in the chain asked to move on.
    #[error("All {attempted} extraction strategies failed. Last: {last_reason}")]
    Exhausted {
        attempted: usize,
        last_reason: String,
    },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A worker process died or answered with something other than an outcome.
    #[error("Worker process for '{file}' crashed ({status})\n{stderr}")]
    WorkerCrashed {
        file: String,
        status: String,
        stderr: String,
    },
}

impl ExtractError {
    /// The variant name, used as the "type name" in failure messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::PdfiumBindingFailed(_) => "PdfiumBindingFailed",
            ExtractError::OpenFailed { .. } => "OpenFailed",
            ExtractError::PageFailed { .. } => "PageFailed",
            ExtractError::ConversionFailed(_) => "ConversionFailed",
            ExtractError::TableDetectionFailed { .. } => "TableDetectionFailed",
            ExtractError::Panic(_) => "Panic",
            ExtractError::Exhausted { .. } => "Exhausted",
            ExtractError::Write { .. } => "Write",
            ExtractError::WorkerCrashed { .. } => "WorkerCrashed",
        }
    }

    /// Build a [`ExtractError::Panic`] from a `catch_unwind` / `JoinError` payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        ExtractError::Panic(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_dir_not_found_display() {
        let e = BatchError::InputDirNotFound {
            path: PathBuf::from("/nope"),
        };
        assert!(e.to_string().contains("/nope"), "got: {e}");
    }

    #[test]
    fn exhausted_display() {
        let e = ExtractError::Exhausted {
            attempted: 2,
            last_reason: "cannot open".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("All 2"));
        assert!(msg.contains("cannot open"));
    }

    #[test]
    fn kind_matches_variant() {
        let e = ExtractError::OpenFailed {
            path: PathBuf::from("x.pdf"),
            detail: "bad xref".into(),
        };
        assert_eq!(e.kind(), "OpenFailed");
        assert_eq!(ExtractError::Panic("boom".into()).kind(), "Panic");
    }

    #[test]
    fn panic_payload_str_and_string() {
        let p: Box<dyn std::any::Any + Send> = Box::new("static boom");
        assert_eq!(ExtractError::from_panic(p.as_ref()).to_string(), "Extraction panicked: static boom");

        let p: Box<dyn std::any::Any + Send> = Box::new(String::from("owned boom"));
        assert!(ExtractError::from_panic(p.as_ref()).to_string().contains("owned boom"));

        let p: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert!(ExtractError::from_panic(p.as_ref()).to_string().contains("non-string"));
    }
}
