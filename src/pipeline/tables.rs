//! Three-tier table extraction and Markdown rendering.
//!
//! ```text
//! lattice ──0 tables / error──▶ stream
//!    └───────────────┬───────────┘
//!                    ▼
//!   page scanner, only for pages still missing
//! ```
//!
//! Errors from the two detector tiers are logged and treated as "no tables".
//! Scanner errors (binding, open) propagate to the caller; unreadable pages
//! are skipped inside the scanner.

use crate::backend::{PageTableScanner, RawTable, TableDetector, TableFlavor};
use crate::config::PageSelection;
use crate::error::ExtractError;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// 1-based page number → Markdown tables found on that page, in order.
pub type TablesByPage = BTreeMap<usize, Vec<String>>;

/// Run all three tiers over `path`.
pub fn extract_tables(
    path: &Path,
    pages: &PageSelection,
    detector: &dyn TableDetector,
    scanner: &dyn PageTableScanner,
) -> Result<TablesByPage, ExtractError> {
    let mut tables = TablesByPage::new();

    for table in detect_with_fallback(path, pages, detector) {
        insert(&mut tables, &table);
    }

    let populated: Vec<usize> = tables.keys().copied().collect();
    let wanted = |page: usize| pages.contains(page) && !populated.contains(&page);
    for table in scanner.scan(path, &wanted)? {
        if populated.contains(&table.page) {
            continue;
        }
        insert(&mut tables, &table);
    }

    debug!(
        "Tables in {}: {} on {} pages",
        path.display(),
        tables.values().map(Vec::len).sum::<usize>(),
        tables.len()
    );
    Ok(tables)
}

fn detect_with_fallback(
    path: &Path,
    pages: &PageSelection,
    detector: &dyn TableDetector,
) -> Vec<RawTable> {
    let lattice = detector.detect(path, pages, TableFlavor::Lattice);
    let result = match lattice {
        Ok(found) if !found.is_empty() => return found,
        Ok(_) => {
            debug!("No lattice tables in {}; trying stream", path.display());
            detector.detect(path, pages, TableFlavor::Stream)
        }
        Err(e) => {
            debug!("Lattice detection failed on {}: {e}", path.display());
            detector.detect(path, pages, TableFlavor::Stream)
        }
    };
    result.unwrap_or_else(|e| {
        debug!("Stream detection failed on {}: {e}", path.display());
        Vec::new()
    })
}

fn insert(tables: &mut TablesByPage, table: &RawTable) {
    if table.cells.is_empty() {
        return;
    }
    tables
        .entry(table.page)
        .or_default()
        .push(render_table_markdown(&table.cells));
}

/// Render raw cells as a Markdown pipe table.
///
/// With two or more rows the first row is the header. A single row is
/// rendered as one pipe row with no header separator.
pub fn render_table_markdown(rows: &[Vec<Option<String>>]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let render_row = |row: &Vec<Option<String>>| {
        let cells: Vec<String> = (0..width)
            .map(|i| escape_cell(row.get(i).and_then(Option::as_deref).unwrap_or("")))
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines: Vec<String> = Vec::with_capacity(rows.len() + 1);
    match rows {
        [] => {}
        [only] => lines.push(render_row(only)),
        [header, body @ ..] => {
            lines.push(render_row(header));
            lines.push(format!("|{}", " --- |".repeat(width)));
            lines.extend(body.iter().map(render_row));
        }
    }
    lines.join("\n")
}

fn escape_cell(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

/// Append a `## Tables` section, one `### Page N` heading per page.
///
/// Returns `markdown` unchanged when there are no tables.
pub fn append_tables(markdown: &str, tables: &TablesByPage) -> String {
    if tables.is_empty() {
        return markdown.to_string();
    }

    let mut out = markdown.trim_end().to_string();
    if !out.is_empty() {
        out.push_str("\n\n");
    }
    out.push_str("## Tables");
    for (page, rendered) in tables {
        out.push_str(&format!("\n\n### Page {page}"));
        for table in rendered {
            out.push_str("\n\n");
            out.push_str(table);
        }
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<Option<String>>> {
        rows.iter()
            .map(|r| r.iter().map(|c| Some(c.to_string())).collect())
            .collect()
    }

    fn table(page: usize) -> RawTable {
        let label = format!("p{page}");
        RawTable {
            page,
            cells: grid(&[&["h"], &[label.as_str()]]),
        }
    }

    #[derive(Default)]
    struct FakeDetector {
        lattice: Option<Vec<RawTable>>,
        stream: Option<Vec<RawTable>>,
        calls: Mutex<Vec<TableFlavor>>,
    }

    impl TableDetector for FakeDetector {
        fn detect(
            &self,
            _path: &Path,
            _pages: &PageSelection,
            flavor: TableFlavor,
        ) -> Result<Vec<RawTable>, ExtractError> {
            self.calls.lock().unwrap().push(flavor);
            let found = match flavor {
                TableFlavor::Lattice => &self.lattice,
                TableFlavor::Stream => &self.stream,
            };
            found.clone().ok_or(ExtractError::TableDetectionFailed {
                tier: flavor.name(),
                detail: "ghostscript missing".into(),
            })
        }
    }

    struct FakeScanner {
        tables: Result<Vec<RawTable>, ()>,
        scanned: AtomicUsize,
    }

    impl FakeScanner {
        fn finds(tables: Vec<RawTable>) -> Self {
            Self {
                tables: Ok(tables),
                scanned: AtomicUsize::new(0),
            }
        }
    }

    impl PageTableScanner for FakeScanner {
        fn scan(
            &self,
            _path: &Path,
            wanted: &dyn Fn(usize) -> bool,
        ) -> Result<Vec<RawTable>, ExtractError> {
            let tables = self.tables.clone().map_err(|_| ExtractError::TableDetectionFailed {
                tier: "scanner",
                detail: "broken page".into(),
            })?;
            let kept: Vec<RawTable> = tables.into_iter().filter(|t| wanted(t.page)).collect();
            self.scanned.fetch_add(kept.len(), Ordering::SeqCst);
            Ok(kept)
        }
    }

    fn run(detector: &FakeDetector, scanner: &FakeScanner) -> Result<TablesByPage, ExtractError> {
        extract_tables(Path::new("t.pdf"), &PageSelection::All, detector, scanner)
    }

    #[test]
    fn lattice_hits_skip_stream() {
        let detector = FakeDetector {
            lattice: Some(vec![table(1)]),
            stream: Some(vec![table(2)]),
            ..Default::default()
        };
        let tables = run(&detector, &FakeScanner::finds(vec![])).unwrap();
        assert_eq!(tables.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(*detector.calls.lock().unwrap(), vec![TableFlavor::Lattice]);
    }

    #[test]
    fn empty_lattice_falls_back_to_stream() {
        let detector = FakeDetector {
            lattice: Some(vec![]),
            stream: Some(vec![table(2)]),
            ..Default::default()
        };
        let tables = run(&detector, &FakeScanner::finds(vec![])).unwrap();
        assert!(tables.contains_key(&2));
    }

    #[test]
    fn detector_errors_are_swallowed() {
        let detector = FakeDetector::default();
        let tables = run(&detector, &FakeScanner::finds(vec![table(3)])).unwrap();
        assert_eq!(tables.keys().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(detector.calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn scanner_never_overwrites_detected_pages() {
        let detector = FakeDetector {
            lattice: Some(vec![table(1)]),
            ..Default::default()
        };
        let mut from_scanner = table(1);
        from_scanner.cells = grid(&[&["scanner"], &["row"]]);
        let scanner = FakeScanner::finds(vec![from_scanner, table(4)]);

        let tables = run(&detector, &scanner).unwrap();

        assert_eq!(tables[&1].len(), 1);
        assert!(tables[&1][0].contains("p1"));
        assert!(tables.contains_key(&4));
        assert_eq!(scanner.scanned.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn scanner_errors_propagate() {
        let detector = FakeDetector::default();
        let scanner = FakeScanner {
            tables: Err(()),
            scanned: AtomicUsize::new(0),
        };
        let err = run(&detector, &scanner).unwrap_err();
        assert_eq!(err.kind(), "TableDetectionFailed");
    }

    #[test]
    fn scanner_respects_table_pages() {
        let detector = FakeDetector {
            lattice: Some(vec![]),
            stream: Some(vec![]),
            ..Default::default()
        };
        let scanner = FakeScanner::finds((1..=5).map(table).collect());

        let tables = extract_tables(
            Path::new("t.pdf"),
            &PageSelection::Single(1),
            &detector,
            &scanner,
        )
        .unwrap();

        assert_eq!(tables.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(scanner.scanned.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_tables_anywhere_is_empty_map() {
        let detector = FakeDetector {
            lattice: Some(vec![]),
            stream: Some(vec![]),
            ..Default::default()
        };
        assert!(run(&detector, &FakeScanner::finds(vec![])).unwrap().is_empty());
    }

    #[test]
    fn render_with_header() {
        let md = render_table_markdown(&grid(&[&["Name", "Qty"], &["Apple", "3"]]));
        assert_eq!(md, "| Name | Qty |\n| --- | --- |\n| Apple | 3 |");
    }

    #[test]
    fn render_single_row_has_no_header() {
        let md = render_table_markdown(&grid(&[&["a", "b"]]));
        assert_eq!(md, "| a | b |");
    }

    #[test]
    fn render_escapes_and_pads() {
        let rows = vec![
            vec![Some("x|y".to_string()), Some("multi\nline".to_string())],
            vec![None],
        ];
        let md = render_table_markdown(&rows);
        assert_eq!(md, "| x\\|y | multi line |\n| --- | --- |\n|  |  |");
    }

    #[test]
    fn append_tables_in_page_order() {
        let mut tables = TablesByPage::new();
        tables.insert(3, vec!["| c |".into()]);
        tables.insert(1, vec!["| a |".into(), "| b |".into()]);

        let out = append_tables("# Doc\n\nBody\n", &tables);
        assert_eq!(
            out,
            "# Doc\n\nBody\n\n## Tables\n\n### Page 1\n\n| a |\n\n| b |\n\n### Page 3\n\n| c |\n"
        );
    }

    #[test]
    fn append_nothing_is_identity() {
        assert_eq!(append_tables("text", &TablesByPage::new()), "text");
    }
}
