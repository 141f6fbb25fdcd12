//! Configuration types for a batch conversion run.
//!
//! Every knob lives in [`BatchConfig`], built via its [`BatchConfigBuilder`]
//! and passed explicitly into [`crate::batch::run_batch`]. There are no
//! process-wide defaults to mutate.

use crate::error::BatchError;
use crate::progress::ProgressCallback;
use crate::worker::TaskRunner;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Default size of the worker pool. Fixed, not derived from the CPU count.
pub const DEFAULT_WORKERS: usize = 10;

/// Configuration for a batch conversion.
///
/// # Example
/// ```rust
/// use pdf2md_batch::{BatchConfig, OutputFormat};
///
/// let config = BatchConfig::builder("data", "extracted")
///     .workers(4)
///     .format(OutputFormat::Markdown)
///     .extract_tables(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.workers, 4);
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Directory scanned (non-recursively) for `*.pdf` files.
    pub input_dir: PathBuf,

    /// Directory receiving one output file per input. Created if absent.
    pub output_dir: PathBuf,

    /// Number of concurrent workers. Default: [`DEFAULT_WORKERS`].
    pub workers: usize,

    /// Treat an existing output file as already done. Default: true.
    ///
    /// A crash in the middle of a non-atomic write leaves a truncated file
    /// that this check will happily skip next time; keep `atomic_writes` on.
    pub skip_existing: bool,

    /// Per-task behaviour shared by every file in the batch.
    pub task: TaskOptions,

    /// Order of the itemised error list in the final report. Default: completion order.
    pub error_order: ErrorOrder,

    /// Pre-constructed runner. If None, a thread runner over pdfium is used.
    pub runner: Option<Arc<dyn TaskRunner>>,

    /// Optional progress callback fired as files complete.
    pub progress_callback: Option<ProgressCallback>,
}

/// Options copied into every [`crate::task::Task`].
///
/// Serializable because the process runner hands them to a child process
/// on its command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Markdown (`.md`) or plain text (`.txt`). Default: Markdown.
    pub format: OutputFormat,

    /// Append detected tables to Markdown output. Default: true.
    ///
    /// Ignored for [`OutputFormat::Text`].
    pub extract_tables: bool,

    /// Pages handed to the table detectors. Default: all.
    pub table_pages: PageSelection,

    /// Join words split by a line-end hyphen. Default: true.
    pub dehyphenate: bool,

    /// Write through a temp file and rename. Default: true.
    pub atomic_writes: bool,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            extract_tables: true,
            table_pages: PageSelection::default(),
            dehyphenate: true,
            atomic_writes: true,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("workers", &self.workers)
            .field("skip_existing", &self.skip_existing)
            .field("task", &self.task)
            .field("error_order", &self.error_order)
            .field("runner", &self.runner.as_ref().map(|_| "<dyn TaskRunner>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: BatchConfig {
                input_dir: input_dir.into(),
                output_dir: output_dir.into(),
                workers: DEFAULT_WORKERS,
                skip_existing: true,
                task: TaskOptions::default(),
                error_order: ErrorOrder::default(),
                runner: None,
                progress_callback: None,
            },
        }
    }
}

/// Builder for [`BatchConfig`].
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n;
        self
    }

    pub fn skip_existing(mut self, v: bool) -> Self {
        self.config.skip_existing = v;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.task.format = format;
        self
    }

    pub fn extract_tables(mut self, v: bool) -> Self {
        self.config.task.extract_tables = v;
        self
    }

    pub fn table_pages(mut self, selection: PageSelection) -> Self {
        self.config.task.table_pages = selection;
        self
    }

    pub fn dehyphenate(mut self, v: bool) -> Self {
        self.config.task.dehyphenate = v;
        self
    }

    pub fn atomic_writes(mut self, v: bool) -> Self {
        self.config.task.atomic_writes = v;
        self
    }

    pub fn error_order(mut self, order: ErrorOrder) -> Self {
        self.config.error_order = order;
        self
    }

    pub fn runner(mut self, runner: Arc<dyn TaskRunner>) -> Self {
        self.config.runner = Some(runner);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        let c = &self.config;
        if c.workers == 0 {
            return Err(BatchError::InvalidConfig("Workers must be ≥ 1".into()));
        }
        if c.input_dir.as_os_str().is_empty() {
            return Err(BatchError::InvalidConfig(
                "Input directory must not be empty".into(),
            ));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(BatchError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        if let PageSelection::Range(start, end) = c.task.table_pages {
            if start == 0 || start > end {
                return Err(BatchError::InvalidConfig(format!(
                    "Invalid table page range {start}-{end}"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// What kind of file each PDF becomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Layout-aware Markdown with a per-page fallback. (default)
    #[default]
    Markdown,
    /// Plain page text joined by newlines.
    Text,
}

impl OutputFormat {
    /// File extension of the output, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Text => "txt",
        }
    }
}

/// How the final error list is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorOrder {
    /// As the workers reported them. (default)
    #[default]
    Completion,
    /// By file name, for reproducible reports.
    Alphabetical,
}

/// Specifies which pages of a PDF to hand to the table detectors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Whether a 1-indexed page falls inside the selection.
    pub fn contains(&self, page: usize) -> bool {
        match self {
            PageSelection::All => page >= 1,
            PageSelection::Single(p) => *p == page,
            PageSelection::Range(start, end) => page >= *start && page <= *end,
            PageSelection::Set(pages) => pages.contains(&page),
        }
    }
}

/// Accepts `all`, `5`, `3-15` or `1,3,5` (1-based, case-insensitive `all`).
impl FromStr for PageSelection {
    type Err = BatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = |why: String| BatchError::InvalidConfig(format!("page list '{text}': {why}"));
        let page = |token: &str| match token.trim().parse::<usize>() {
            Ok(0) => Err(invalid("page numbers start at 1".into())),
            Ok(n) => Ok(n),
            Err(_) => Err(invalid(format!("'{}' is not a page number", token.trim()))),
        };

        if text.eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }
        if let Some((first, last)) = text.split_once('-') {
            let (first, last) = (page(first)?, page(last)?);
            if first > last {
                return Err(invalid(format!("range ends before it starts ({first} > {last})")));
            }
            return Ok(PageSelection::Range(first, last));
        }
        if text.contains(',') {
            let mut pages = text.split(',').map(page).collect::<Result<Vec<_>, _>>()?;
            pages.sort_unstable();
            pages.dedup();
            return Ok(PageSelection::Set(pages));
        }
        page(text).map(PageSelection::Single)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let c = BatchConfig::builder("in", "out").build().unwrap();
        assert_eq!(c.workers, DEFAULT_WORKERS);
        assert!(c.skip_existing);
        assert_eq!(c.task.format, OutputFormat::Markdown);
        assert!(c.task.extract_tables);
        assert!(c.task.atomic_writes);
        assert_eq!(c.error_order, ErrorOrder::Completion);
    }

    #[test]
    fn zero_workers_rejected() {
        let err = BatchConfig::builder("in", "out").workers(0).build().unwrap_err();
        assert!(err.to_string().contains("Workers"));
    }

    #[test]
    fn empty_dirs_rejected() {
        assert!(BatchConfig::builder("", "out").build().is_err());
        assert!(BatchConfig::builder("in", "").build().is_err());
    }

    #[test]
    fn inverted_table_range_rejected() {
        let err = BatchConfig::builder("in", "out")
            .table_pages(PageSelection::Range(5, 2))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("5-2"));
    }

    #[test]
    fn extension_per_format() {
        assert_eq!(OutputFormat::Markdown.extension(), "md");
        assert_eq!(OutputFormat::Text.extension(), "txt");
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(3, 10).to_indices(4), vec![2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2]
        );
    }

    #[test]
    fn page_selection_contains() {
        assert!(PageSelection::All.contains(7));
        assert!(!PageSelection::All.contains(0));
        assert!(PageSelection::Range(2, 4).contains(4));
        assert!(!PageSelection::Range(2, 4).contains(5));
        assert!(PageSelection::Set(vec![1, 9]).contains(9));
    }

    #[test]
    fn page_selection_from_str() {
        assert_eq!("ALL".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!(" 4 ".parse::<PageSelection>().unwrap(), PageSelection::Single(4));
        assert_eq!("2 - 5".parse::<PageSelection>().unwrap(), PageSelection::Range(2, 5));
        assert_eq!(
            "3,1,3".parse::<PageSelection>().unwrap(),
            PageSelection::Set(vec![1, 3])
        );
    }

    #[test]
    fn page_selection_from_str_rejects() {
        for bad in ["0", "5-2", "1,x", "first", "", "2-", "0,4"] {
            let err = bad.parse::<PageSelection>().unwrap_err();
            assert!(matches!(err, BatchError::InvalidConfig(_)), "{bad}: {err}");
        }
        let err = "5-2".parse::<PageSelection>().unwrap_err();
        assert!(err.to_string().contains("range ends before it starts"));
    }

    #[test]
    fn task_options_roundtrip_through_json() {
        let opts = TaskOptions {
            format: OutputFormat::Text,
            extract_tables: true,
            table_pages: PageSelection::Set(vec![2, 4]),
            dehyphenate: false,
            atomic_writes: false,
        };
        let json = serde_json::to_string(&opts).unwrap();
        let back: TaskOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);
    }
}
