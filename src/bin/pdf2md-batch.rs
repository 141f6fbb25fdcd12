//! CLI binary for pdf2md-batch.
//!
//! A thin shim over the library crate that maps CLI flags to `BatchConfig`
//! and prints the report. The same binary doubles as the worker process
//! for `--isolation process`.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2md_batch::{
    run_batch, run_worker_task, BatchConfig, BatchProgressCallback, BatchReport, Collaborators,
    ErrorOrder, OutputFormat, PageSelection, ProcessRunner, ProgressCallback, TaskOutcome,
    TaskRunner, ThreadRunner,
};
use std::io;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── Terminal styling ─────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Style {
    Bold = 1,
    Dim = 2,
    Red = 31,
    Green = 32,
    Cyan = 36,
}

impl Style {
    fn paint(self, text: impl std::fmt::Display) -> String {
        format!("\x1b[{}m{text}\x1b[0m", self as u8)
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal callback: announces the batch, then either drives a progress bar
/// or prints one line per file.
struct CliProgressCallback {
    bar: Option<ProgressBar>,
}

impl CliProgressCallback {
    fn new(show_bar: bool) -> Arc<Self> {
        let bar = show_bar.then(|| {
            let bar = ProgressBar::new(0);
            let style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>4}/{len} files  \
                 ⏱ {elapsed_precise}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
            bar.set_style(style);
            bar.set_prefix("Converting");
            bar
        });
        Arc::new(Self { bar })
    }

    fn line(&self, text: String) {
        match self.bar {
            Some(ref bar) => bar.println(text),
            None => eprintln!("{text}"),
        }
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize, workers: usize) {
        println!("Found {total_files} PDFs");
        println!("Using {workers} workers");
        if let Some(ref bar) = self.bar {
            bar.set_length(total_files as u64);
            bar.reset_eta();
            bar.enable_steady_tick(Duration::from_millis(80));
        }
    }

    fn on_file_complete(&self, outcome: &TaskOutcome, done: usize, total: usize) {
        if !outcome.success {
            let first = outcome.message.lines().next().unwrap_or("");
            // Keep the bar readable; the full message is in the summary.
            let msg = if first.chars().count() > 80 {
                format!("{}\u{2026}", first.chars().take(79).collect::<String>())
            } else {
                first.to_string()
            };
            self.line(format!(
                "  {} {:>4}/{:<4} {}  {}",
                Style::Red.paint("✗"),
                done,
                total,
                Style::Bold.paint(&outcome.file_name),
                Style::Red.paint(&msg)
            ));
        } else if self.bar.is_none() {
            let note = if outcome.is_skipped() { " (skipped)" } else { "" };
            self.line(format!(
                "  {} {:>4}/{:<4} {}{}",
                Style::Green.paint("✓"),
                done,
                total,
                outcome.file_name,
                Style::Dim.paint(note)
            ));
        }
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    fn on_batch_complete(&self, report: &BatchReport) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
        if report.total > 0 {
            eprintln!(
                "{} {} converted, {} skipped, {} failed  {}",
                if report.failed == 0 { Style::Green.paint("✔") } else { Style::Cyan.paint("⚠") },
                Style::Bold.paint(report.ok - report.skipped),
                report.skipped,
                report.failed,
                Style::Dim.paint(format!("{:.1}s", report.duration_ms as f64 / 1000.0)),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every PDF in ./data into ./extracted (Markdown, 10 workers)
  pdf2md-batch data extracted

  # Plain text, 4 workers, redo everything
  pdf2md-batch --format txt -w 4 --overwrite data extracted

  # Tables only from the first three pages, reproducible error list
  pdf2md-batch --table-pages 1-3 --sort-errors data extracted

  # In-process threads instead of worker processes
  pdf2md-batch --isolation thread data extracted

  # Machine-readable report
  pdf2md-batch --json data extracted > report.json

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Directory containing libpdfium
  PDF2MD_BATCH_WORKERS    Same as --workers
  RUST_LOG                Override log filtering (e.g. pdf2md_batch=debug)
"#;

/// Convert a directory of PDFs to Markdown or plain text.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md-batch",
    version,
    about = "Convert a directory of PDF files to Markdown with a pool of isolated workers",
    long_about = "Convert every *.pdf in INPUT_DIR to Markdown (or plain text) in OUTPUT_DIR. \
Each file runs in its own worker; a file that fails or crashes is reported at the end \
and never stops the batch.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the PDFs (not searched recursively).
    #[arg(required_unless_present = "worker_task")]
    input_dir: Option<PathBuf>,

    /// Directory receiving one output file per PDF. Created if missing.
    #[arg(required_unless_present = "worker_task")]
    output_dir: Option<PathBuf>,

    /// Number of concurrent workers.
    #[arg(short, long, env = "PDF2MD_BATCH_WORKERS", default_value_t = 10,
          value_parser = clap::value_parser!(u32).range(1..))]
    workers: u32,

    /// Re-convert files whose output already exists.
    #[arg(long, env = "PDF2MD_BATCH_OVERWRITE")]
    overwrite: bool,

    /// Output format.
    #[arg(long, env = "PDF2MD_BATCH_FORMAT", value_enum, default_value = "md")]
    format: FormatArg,

    /// Do not append detected tables to Markdown output.
    #[arg(long, env = "PDF2MD_BATCH_NO_TABLES")]
    no_tables: bool,

    /// Pages scanned for tables: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2MD_BATCH_TABLE_PAGES", default_value = "all",
          value_parser = PageSelection::from_str)]
    table_pages: PageSelection,

    /// Keep line-end hyphenation as extracted.
    #[arg(long, env = "PDF2MD_BATCH_NO_DEHYPHENATE")]
    no_dehyphenate: bool,

    /// Write output files in place instead of through a temp file.
    #[arg(long, env = "PDF2MD_BATCH_DIRECT_WRITE")]
    direct_write: bool,

    /// Where each file is converted.
    #[arg(
        long,
        env = "PDF2MD_BATCH_ISOLATION",
        value_enum,
        default_value = "process",
        long_help = "process: one child process per file; survives native crashes and runs \
pdfium truly in parallel.\nthread: in-process blocking threads; lower overhead, but pdfium \
calls are serialised and an abort takes the whole batch down."
    )]
    isolation: IsolationArg,

    /// List errors by file name instead of completion order.
    #[arg(long, env = "PDF2MD_BATCH_SORT_ERRORS")]
    sort_errors: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2MD_BATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MD_BATCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MD_BATCH_QUIET")]
    quiet: bool,

    /// Print the report as JSON instead of the text summary.
    #[arg(long, env = "PDF2MD_BATCH_JSON")]
    json: bool,

    /// Run one serialized task and print its outcome (used by process isolation).
    #[arg(long = "worker-task", value_name = "JSON", hide = true)]
    worker_task: Option<String>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Md,
    Txt,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Md => OutputFormat::Markdown,
            FormatArg::Txt => OutputFormat::Text,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum IsolationArg {
    Process,
    Thread,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active.
    // Worker processes log errors only; the parent shows their stderr on crash.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress || cli.worker_task.is_some() {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Worker mode ──────────────────────────────────────────────────────
    if let Some(ref task_json) = cli.worker_task {
        let outcome = tokio::task::block_in_place(|| {
            run_worker_task(task_json, &Collaborators::pdfium())
        })
        .context("Malformed worker task")?;
        println!(
            "{}",
            serde_json::to_string(&outcome).context("Failed to serialise outcome")?
        );
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if !cli.quiet && !cli.json {
        let cb = CliProgressCallback::new(show_progress);
        Some(cb as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run batch ────────────────────────────────────────────────────────
    let report = run_batch(&config).await.context("Batch failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if report.total == 0 {
        if !cli.quiet {
            println!("No PDF files found.");
        }
    } else if !cli.quiet {
        println!("{}", report.render_summary());
    } else if report.failed > 0 {
        eprintln!("{}", report.render_summary());
    }

    Ok(())
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BatchConfig> {
    let (Some(input_dir), Some(output_dir)) = (&cli.input_dir, &cli.output_dir) else {
        anyhow::bail!("INPUT_DIR and OUTPUT_DIR are required");
    };

    let runner: Arc<dyn TaskRunner> = match cli.isolation {
        IsolationArg::Process => Arc::new(
            ProcessRunner::current_exe().context("Cannot locate own executable for workers")?,
        ),
        IsolationArg::Thread => Arc::new(ThreadRunner::pdfium()),
    };

    let mut builder = BatchConfig::builder(input_dir, output_dir)
        .workers(cli.workers as usize)
        .skip_existing(!cli.overwrite)
        .format(cli.format.into())
        .extract_tables(!cli.no_tables)
        .table_pages(cli.table_pages.clone())
        .dehyphenate(!cli.no_dehyphenate)
        .atomic_writes(!cli.direct_write)
        .error_order(if cli.sort_errors {
            ErrorOrder::Alphabetical
        } else {
            ErrorOrder::Completion
        })
        .runner(runner);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_pages_flag_parses() {
        let cli = Cli::try_parse_from(["pdf2md-batch", "--table-pages", "3,1", "in", "out"])
            .unwrap();
        assert_eq!(cli.table_pages, PageSelection::Set(vec![1, 3]));

        let err = Cli::try_parse_from(["pdf2md-batch", "--table-pages", "5-2", "in", "out"])
            .unwrap_err();
        assert!(err.to_string().contains("range ends before it starts"), "{err}");
    }

    #[test]
    fn style_wraps_in_escape_codes() {
        assert_eq!(Style::Red.paint("x"), "\x1b[31mx\x1b[0m");
        assert_eq!(Style::Bold.paint(42), "\x1b[1m42\x1b[0m");
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["pdf2md-batch", "in", "out"]).unwrap();
        assert_eq!(cli.workers, 10);
        assert_eq!(cli.isolation, IsolationArg::Process);
        assert!(!cli.overwrite);
        assert!(cli.worker_task.is_none());
        assert_eq!(cli.table_pages, PageSelection::All);
    }

    #[test]
    fn worker_mode_needs_no_directories() {
        let cli = Cli::try_parse_from(["pdf2md-batch", "--worker-task", "{}"]).unwrap();
        assert_eq!(cli.worker_task.as_deref(), Some("{}"));
        assert!(cli.input_dir.is_none());
    }

    #[test]
    fn thread_isolation_builds_config() {
        let cli = Cli::try_parse_from([
            "pdf2md-batch",
            "--isolation",
            "thread",
            "--format",
            "txt",
            "--no-tables",
            "--overwrite",
            "in",
            "out",
        ])
        .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.task.format, OutputFormat::Text);
        assert!(!config.task.extract_tables);
        assert!(!config.skip_existing);
    }
}
