//! pdfium-backed collaborators.
//!
//! ## Binding
//!
//! Each call binds its own [`Pdfium`] handle inside the calling thread and
//! drops it when done. Library lookup order:
//!
//! 1. `PDFIUM_LIB_PATH` (directory containing `libpdfium`)
//! 2. the current directory
//! 3. the system library path
//!
//! All calls are blocking; callers run them on a blocking thread or in a
//! worker process.

use super::{
    DocumentOpener, MarkdownConverter, PageSource, PageTableScanner, RawTable, TableDetector,
    TableFlavor,
};
use crate::config::PageSelection;
use crate::error::ExtractError;
use crate::pipeline::grid::{
    lattice_tables, stream_tables, CellGrid, LatticeSettings, Ruling, StreamSettings, TextCell,
};
use crate::pipeline::layout::{document_to_markdown, page_to_markdown, TextLine};
use crate::pipeline::normalize::remove_surrogates;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the directory that holds the pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Implements every collaborator trait on top of pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumBackend {
    lib_dir: Option<PathBuf>,
}

impl PdfiumBackend {
    /// Backend honouring `PDFIUM_LIB_PATH`.
    pub fn new() -> Self {
        Self {
            lib_dir: std::env::var_os(PDFIUM_LIB_PATH_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Backend loading pdfium from a specific directory first.
    pub fn with_library_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            lib_dir: Some(dir.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, ExtractError> {
        let from_dir = |dir: &Path| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
        };
        let bindings = match &self.lib_dir {
            Some(dir) => from_dir(dir).or_else(|_| from_dir(Path::new("./"))),
            None => from_dir(Path::new("./")),
        }
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{e:?}")))?;
        Ok(Pdfium::new(bindings))
    }

    fn open<'a>(&self, pdfium: &'a Pdfium, path: &Path) -> Result<PdfDocument<'a>, ExtractError> {
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| ExtractError::OpenFailed {
                path: path.to_path_buf(),
                detail: format!("{e:?}"),
            })?;
        debug!(
            "PDF loaded: {} ({} pages)",
            path.display(),
            document.pages().len()
        );
        Ok(document)
    }
}

fn page_error(index: usize, e: PdfiumError) -> ExtractError {
    ExtractError::PageFailed {
        page: index + 1,
        detail: format!("{e:?}"),
    }
}

fn get_page<'a>(document: &PdfDocument<'a>, index: usize) -> Result<PdfPage<'a>, ExtractError> {
    let idx = u16::try_from(index).map_err(|_| ExtractError::PageFailed {
        page: index + 1,
        detail: "page index out of range".into(),
    })?;
    document.pages().get(idx).map_err(|e| page_error(index, e))
}

// ── Text lines ───────────────────────────────────────────────────────────────

/// Split a page's characters into lines, keeping the largest font size per line.
///
/// Characters are collected as UTF-16 units so that unpaired surrogates from
/// broken font maps can be dropped before the text becomes a `String`.
fn page_lines(page: &PdfPage, index: usize) -> Result<Vec<TextLine>, ExtractError> {
    let text = page.text().map_err(|e| page_error(index, e))?;
    let height = page.height().value;

    let mut lines = Vec::new();
    let mut units: Vec<u16> = Vec::new();
    let mut size = 0.0f32;
    let mut top: Option<f32> = None;
    let mut after_cr = false;

    let mut flush = |units: &mut Vec<u16>, size: &mut f32, top: &mut Option<f32>| {
        let mut line = TextLine::new(remove_surrogates(units), *size);
        line.top = top.take();
        lines.push(line);
        units.clear();
        *size = 0.0;
    };

    for ch in text.chars().iter() {
        let value = ch.unicode_value();
        match value {
            0x0D => {
                flush(&mut units, &mut size, &mut top);
                after_cr = true;
                continue;
            }
            0x0A => {
                if !after_cr {
                    flush(&mut units, &mut size, &mut top);
                }
                after_cr = false;
                continue;
            }
            _ => after_cr = false,
        }

        push_code_point(&mut units, value);
        size = size.max(ch.scaled_font_size().value);
        if top.is_none() {
            top = ch.loose_bounds().ok().map(|b| height - b.bottom().value);
        }
    }
    if !units.is_empty() {
        flush(&mut units, &mut size, &mut top);
    }

    Ok(lines)
}

fn push_code_point(units: &mut Vec<u16>, value: u32) {
    match u16::try_from(value) {
        Ok(unit) => units.push(unit),
        Err(_) => {
            if let Some(c) = char::from_u32(value) {
                let mut buf = [0u16; 2];
                units.extend_from_slice(c.encode_utf16(&mut buf));
            }
        }
    }
}

impl MarkdownConverter for PdfiumBackend {
    fn convert(&self, path: &Path) -> Result<String, ExtractError> {
        let pdfium = self.bind()?;
        let document = self.open(&pdfium, path)?;

        let mut pages = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let lines = page_lines(&page, index)
                .map_err(|e| ExtractError::ConversionFailed(e.to_string()))?;
            pages.push(lines);
        }
        info!("Layout conversion: {} pages", pages.len());
        Ok(document_to_markdown(&pages))
    }
}

// ── Page-wise access ─────────────────────────────────────────────────────────

struct PdfiumPages<'a, 'd> {
    document: &'d PdfDocument<'a>,
}

impl PageSource for PdfiumPages<'_, '_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_markdown(&self, index: usize) -> Result<String, ExtractError> {
        let page = get_page(self.document, index)?;
        Ok(page_to_markdown(&page_lines(&page, index)?))
    }

    fn page_text(&self, index: usize) -> Result<String, ExtractError> {
        let page = get_page(self.document, index)?;
        let text = page.text().map_err(|e| page_error(index, e))?;
        Ok(text.all())
    }
}

impl DocumentOpener for PdfiumBackend {
    fn with_document(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(&dyn PageSource) -> Result<String, ExtractError>,
    ) -> Result<String, ExtractError> {
        let pdfium = self.bind()?;
        let document = self.open(&pdfium, path)?;
        visit(&PdfiumPages {
            document: &document,
        })
    }
}

// ── Tables ───────────────────────────────────────────────────────────────────

/// Text segments as cells, converted to a top-left origin.
fn text_cells(page: &PdfPage, index: usize) -> Result<Vec<TextCell>, ExtractError> {
    let text = page.text().map_err(|e| page_error(index, e))?;
    let height = page.height().value;

    let cells = text
        .segments()
        .iter()
        .filter_map(|segment| {
            let content = segment.text();
            let content = content.trim();
            if content.is_empty() {
                return None;
            }
            let b = segment.bounds();
            Some(TextCell::new(
                content,
                b.left().value,
                height - b.top().value,
                b.right().value,
                height - b.bottom().value,
            ))
        })
        .collect();
    Ok(cells)
}

/// Bounding boxes of path objects: stroked lines and filled rectangles.
fn rulings(page: &PdfPage) -> Vec<Ruling> {
    let height = page.height().value;
    page.objects()
        .iter()
        .filter(|object| object.object_type() == PdfPageObjectType::Path)
        .filter_map(|object| object.bounds().ok())
        .map(|b| {
            Ruling::new(
                b.left().value,
                height - b.top().value,
                b.right().value,
                height - b.bottom().value,
            )
        })
        .collect()
}

fn has_text(grid: &CellGrid) -> bool {
    grid.iter().flatten().any(Option::is_some)
}

fn page_tables(
    page: &PdfPage,
    index: usize,
    flavor: TableFlavor,
    stream: &StreamSettings,
) -> Result<Vec<CellGrid>, ExtractError> {
    let cells = text_cells(page, index)?;
    let grids = match flavor {
        TableFlavor::Lattice => {
            lattice_tables(&rulings(page), &cells, &LatticeSettings::default())
        }
        TableFlavor::Stream => stream_tables(&cells, stream),
    };
    Ok(grids.into_iter().filter(has_text).collect())
}

impl TableDetector for PdfiumBackend {
    fn detect(
        &self,
        path: &Path,
        pages: &PageSelection,
        flavor: TableFlavor,
    ) -> Result<Vec<RawTable>, ExtractError> {
        let pdfium = self.bind()?;
        let document = self.open(&pdfium, path)?;
        let total = document.pages().len() as usize;
        let settings = StreamSettings::default();

        let mut tables = Vec::new();
        for index in pages.to_indices(total) {
            let page = get_page(&document, index)?;
            let found = page_tables(&page, index, flavor, &settings)?;
            debug!(
                "{} tables on page {}: {}",
                flavor.name(),
                index + 1,
                found.len()
            );
            tables.extend(found.into_iter().map(|cells| RawTable {
                page: index + 1,
                cells,
            }));
        }
        Ok(tables)
    }
}

/// Tables from every wanted page. A page that cannot be read is logged and
/// skipped so the rest of the document still contributes.
fn collect_page_tables<P>(
    pages: impl IntoIterator<Item = P>,
    wanted: &dyn Fn(usize) -> bool,
    mut tables_on: impl FnMut(&P, usize) -> Result<Vec<CellGrid>, ExtractError>,
) -> Vec<RawTable> {
    let mut tables = Vec::new();
    for (index, page) in pages.into_iter().enumerate() {
        if !wanted(index + 1) {
            continue;
        }
        match tables_on(&page, index) {
            Ok(found) => tables.extend(found.into_iter().map(|cells| RawTable {
                page: index + 1,
                cells,
            })),
            Err(e) => warn!("Skipping page {} in table scan: {e}", index + 1),
        }
    }
    tables
}

impl PageTableScanner for PdfiumBackend {
    fn scan(
        &self,
        path: &Path,
        wanted: &dyn Fn(usize) -> bool,
    ) -> Result<Vec<RawTable>, ExtractError> {
        let pdfium = self.bind()?;
        let document = self.open(&pdfium, path)?;
        let relaxed = StreamSettings::relaxed();

        Ok(collect_page_tables(
            document.pages().iter(),
            wanted,
            |page, index| {
                let found = page_tables(page, index, TableFlavor::Lattice, &relaxed)?;
                if !found.is_empty() {
                    return Ok(found);
                }
                page_tables(page, index, TableFlavor::Stream, &relaxed)
            },
        ))
    }
}
