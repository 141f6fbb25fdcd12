//! Extraction strategies and the chain that tries them in order.
//!
//! Each strategy reports a tagged [`Attempt`] instead of raising:
//!
//! ```text
//! LayoutMarkdown ──TryNext──▶ PagewiseMarkdown ──TryNext──▶ Exhausted
//!       │                           │
//!      Done                    Done / Fatal
//! ```
//!
//! The chain stops at the first `Done` or `Fatal`. Nothing is retried.

use crate::backend::{DocumentOpener, MarkdownConverter, PageSource};
use crate::config::OutputFormat;
use crate::error::ExtractError;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Separator between pages in the page-wise fallback.
pub const PAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Outcome of one strategy.
#[derive(Debug)]
pub enum Attempt {
    /// Extraction succeeded with this text.
    Done(String),
    /// This strategy gave up; the reason is kept for the final error.
    TryNext(String),
    /// Give up on the document altogether.
    Fatal(ExtractError),
}

/// One way of turning a PDF into text.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn attempt(&self, path: &Path) -> Attempt;
}

/// An ordered list of strategies.
pub struct StrategyChain {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// The chain for an output format.
    ///
    /// Markdown: layout-aware conversion, then page-wise Markdown.
    /// Text: page text only.
    pub fn for_format(
        format: OutputFormat,
        converter: Arc<dyn MarkdownConverter>,
        documents: Arc<dyn DocumentOpener>,
    ) -> Self {
        match format {
            OutputFormat::Markdown => Self::new(vec![
                Box::new(LayoutMarkdown { converter }),
                Box::new(PagewiseMarkdown { documents }),
            ]),
            OutputFormat::Text => Self::new(vec![Box::new(PlainText { documents })]),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run strategies until one is `Done` or `Fatal`.
    pub fn run(&self, path: &Path) -> Result<String, ExtractError> {
        let mut last_reason = String::from("no strategies configured");
        for strategy in &self.strategies {
            debug!("Trying strategy '{}' on {}", strategy.name(), path.display());
            match strategy.attempt(path) {
                Attempt::Done(text) => return Ok(text),
                Attempt::Fatal(e) => return Err(e),
                Attempt::TryNext(reason) => {
                    warn!(
                        "Strategy '{}' failed on {}: {}",
                        strategy.name(),
                        path.display(),
                        reason
                    );
                    last_reason = reason;
                }
            }
        }
        Err(ExtractError::Exhausted {
            attempted: self.strategies.len(),
            last_reason,
        })
    }
}

// ── Strategies ───────────────────────────────────────────────────────────────

/// Full-document, layout-aware conversion. Errors and panics both fall through.
pub struct LayoutMarkdown {
    pub converter: Arc<dyn MarkdownConverter>,
}

impl Strategy for LayoutMarkdown {
    fn name(&self) -> &'static str {
        "layout-markdown"
    }

    fn attempt(&self, path: &Path) -> Attempt {
        let result = catch_unwind(AssertUnwindSafe(|| self.converter.convert(path)))
            .unwrap_or_else(|payload| Err(ExtractError::from_panic(payload.as_ref())));
        match result {
            Ok(markdown) => Attempt::Done(markdown),
            Err(e) => Attempt::TryNext(format!("{}: {e}", e.kind())),
        }
    }
}

/// Per-page Markdown, falling back to that page's plain text.
pub struct PagewiseMarkdown {
    pub documents: Arc<dyn DocumentOpener>,
}

impl Strategy for PagewiseMarkdown {
    fn name(&self) -> &'static str {
        "pagewise-markdown"
    }

    fn attempt(&self, path: &Path) -> Attempt {
        let mut visit =
            |doc: &dyn PageSource| -> Result<String, ExtractError> { Ok(pagewise(doc)) };
        match self.documents.with_document(path, &mut visit) {
            Ok(markdown) => Attempt::Done(markdown),
            Err(e) => Attempt::Fatal(e),
        }
    }
}

fn pagewise(doc: &dyn PageSource) -> String {
    (0..doc.page_count())
        .map(|i| match doc.page_markdown(i) {
            Ok(md) => md,
            Err(e) => {
                debug!("Page {} markdown failed ({e}); using plain text", i + 1);
                doc.page_text(i).unwrap_or_else(|e| {
                    warn!("Page {} text failed too: {e}", i + 1);
                    String::new()
                })
            }
        })
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}

/// Plain page text joined by newlines.
pub struct PlainText {
    pub documents: Arc<dyn DocumentOpener>,
}

impl Strategy for PlainText {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    fn attempt(&self, path: &Path) -> Attempt {
        let mut visit = |doc: &dyn PageSource| -> Result<String, ExtractError> {
            (0..doc.page_count())
                .map(|i| doc.page_text(i))
                .collect::<Result<Vec<_>, _>>()
                .map(|pages| pages.join("\n"))
        };
        match self.documents.with_document(path, &mut visit) {
            Ok(text) => Attempt::Done(text),
            Err(e) => Attempt::Fatal(e),
        }
    }
}
