//! Collaborator seams: everything that actually reads a PDF.
//!
//! The strategy chain and the table extractor never touch pdfium directly.
//! They talk to four small traits, bundled in [`Collaborators`]:
//!
//! | Trait | Used by |
//! |-------|---------|
//! | [`MarkdownConverter`] | primary, layout-aware strategy |
//! | [`DocumentOpener`] → [`PageSource`] | page-wise fallback and plain-text strategies |
//! | [`TableDetector`] | lattice and stream tiers |
//! | [`PageTableScanner`] | last-resort per-page tier |
//!
//! [`Collaborators::pdfium`] wires all four to the pdfium backend; tests
//! substitute fakes.

pub mod pdfium;

#[cfg(test)]
pub(crate) mod fakes;

use crate::config::PageSelection;
use crate::error::ExtractError;
use crate::pipeline::grid::CellGrid;
use std::path::Path;
use std::sync::Arc;

/// A table as reported by a detector, before rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// 1-based page number.
    pub page: usize,
    pub cells: CellGrid,
}

/// Detection technique requested from a [`TableDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFlavor {
    /// Ruling-line based.
    Lattice,
    /// Whitespace/alignment based.
    Stream,
}

impl TableFlavor {
    pub fn name(&self) -> &'static str {
        match self {
            TableFlavor::Lattice => "lattice",
            TableFlavor::Stream => "stream",
        }
    }
}

/// Whole-document, layout-aware Markdown conversion.
pub trait MarkdownConverter: Send + Sync {
    fn convert(&self, path: &Path) -> Result<String, ExtractError>;
}

/// An open document, page by page. Indices are 0-based.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Markdown-flavoured text of one page.
    fn page_markdown(&self, index: usize) -> Result<String, ExtractError>;

    /// Plain text of one page.
    fn page_text(&self, index: usize) -> Result<String, ExtractError>;
}

/// Opens documents for page-wise access.
///
/// The document only lives for the duration of `visit`, which keeps
/// backends with borrowed handles (pdfium documents borrow their library
/// binding) expressible behind a trait object.
pub trait DocumentOpener: Send + Sync {
    fn with_document(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(&dyn PageSource) -> Result<String, ExtractError>,
    ) -> Result<String, ExtractError>;
}

/// Detects tables on the selected pages of a document.
pub trait TableDetector: Send + Sync {
    fn detect(
        &self,
        path: &Path,
        pages: &PageSelection,
        flavor: TableFlavor,
    ) -> Result<Vec<RawTable>, ExtractError>;
}

/// Generic per-page table finder, run on pages the detectors left empty.
pub trait PageTableScanner: Send + Sync {
    /// Scan every page for which `wanted(page)` holds (1-based).
    fn scan(&self, path: &Path, wanted: &dyn Fn(usize) -> bool)
        -> Result<Vec<RawTable>, ExtractError>;
}

/// The set of collaborators a task needs.
#[derive(Clone)]
pub struct Collaborators {
    pub converter: Arc<dyn MarkdownConverter>,
    pub documents: Arc<dyn DocumentOpener>,
    pub detector: Arc<dyn TableDetector>,
    pub scanner: Arc<dyn PageTableScanner>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

impl Collaborators {
    /// All four collaborators backed by pdfium.
    pub fn pdfium() -> Self {
        let backend = Arc::new(pdfium::PdfiumBackend::new());
        Self {
            converter: backend.clone(),
            documents: backend.clone(),
            detector: backend.clone(),
            scanner: backend,
        }
    }
}
