//! Table geometry: recover cell grids from positioned text and ruling lines.
//!
//! Two complementary heuristics, named after the techniques they imitate:
//!
//! 1. **Lattice**: the table draws its borders. Horizontal and vertical
//!    rulings that touch each other form a component; the distinct x
//!    positions of its vertical rulings and y positions of its horizontal
//!    rulings are the column and row boundaries.
//! 2. **Stream**: no borders, only alignment. Text cells are clustered
//!    into rows by their vertical centre, consecutive rows with a similar
//!    cell count form a region, and the left edges of the region's cells are
//!    clustered into column boundaries.
//!
//! All coordinates use a top-left origin, in PDF points.

use std::cmp::Ordering;

/// Rows of cells; `None` marks an empty cell.
pub type CellGrid = Vec<Vec<Option<String>>>;

/// A run of text with its bounding box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextCell {
    pub text: String,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TextCell {
    pub fn new(text: impl Into<String>, left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            text: text.into(),
            left,
            top,
            right,
            bottom,
        }
    }

    fn center_x(&self) -> f32 {
        (self.left + self.right) / 2.0
    }

    fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }
}

/// A stroked line or the outline of a filled rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruling {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Ruling {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    fn width(&self) -> f32 {
        self.right - self.left
    }

    fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Tuning knobs for lattice detection.
#[derive(Debug, Clone)]
pub struct LatticeSettings {
    /// Maximum thickness of a ruling, and snapping distance between edges.
    pub tolerance: f32,
    /// Rulings shorter than this are ignored (underlines, tick marks).
    pub min_length: f32,
}

impl Default for LatticeSettings {
    fn default() -> Self {
        Self {
            tolerance: 3.0,
            min_length: 10.0,
        }
    }
}

/// Tuning knobs for stream detection.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Cells whose vertical centres are within this distance share a row.
    pub row_tolerance: f32,
    /// Left edges within this distance share a column.
    pub col_tolerance: f32,
    /// Minimum cells to consider a region as a table.
    pub min_cells: usize,
    /// Minimum rows to consider a region as a table.
    pub min_rows: usize,
    /// Minimum columns to consider a region as a table.
    pub min_cols: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            row_tolerance: 5.0,
            col_tolerance: 10.0,
            min_cells: 6,
            min_rows: 2,
            min_cols: 2,
        }
    }
}

impl StreamSettings {
    /// Looser settings for the last-resort page scan: any 2×2 aligned block.
    pub fn relaxed() -> Self {
        Self {
            min_cells: 4,
            ..Self::default()
        }
    }
}

// ── Lattice ──────────────────────────────────────────────────────────────────

/// Detect bordered tables from rulings and fill them with the page's text.
pub fn lattice_tables(
    rulings: &[Ruling],
    cells: &[TextCell],
    settings: &LatticeSettings,
) -> Vec<CellGrid> {
    let edges = split_into_edges(rulings, settings);
    let components = connected_components(&edges, settings.tolerance);

    let mut tables: Vec<(f32, CellGrid)> = components
        .into_iter()
        .filter_map(|component| {
            let members: Vec<Edge> = component.iter().map(|&i| edges[i]).collect();
            build_lattice(&members, cells, settings.tolerance)
        })
        .collect();

    tables.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    tables.into_iter().map(|(_, grid)| grid).collect()
}

#[derive(Debug, Clone, Copy)]
enum Edge {
    /// y, x-from, x-to
    Horizontal(f32, f32, f32),
    /// x, y-from, y-to
    Vertical(f32, f32, f32),
}

fn split_into_edges(rulings: &[Ruling], settings: &LatticeSettings) -> Vec<Edge> {
    let tol = settings.tolerance;
    let min = settings.min_length;
    let mut edges = Vec::new();

    for r in rulings {
        let thin_h = r.height() <= tol;
        let thin_v = r.width() <= tol;
        if thin_h && r.width() >= min {
            edges.push(Edge::Horizontal((r.top + r.bottom) / 2.0, r.left, r.right));
        } else if thin_v && r.height() >= min {
            edges.push(Edge::Vertical((r.left + r.right) / 2.0, r.top, r.bottom));
        } else if !thin_h && !thin_v && r.width() >= min && r.height() >= min {
            // Cell drawn as a rectangle: keep all four sides.
            edges.push(Edge::Horizontal(r.top, r.left, r.right));
            edges.push(Edge::Horizontal(r.bottom, r.left, r.right));
            edges.push(Edge::Vertical(r.left, r.top, r.bottom));
            edges.push(Edge::Vertical(r.right, r.top, r.bottom));
        }
    }
    edges
}

fn touches(a: &Edge, b: &Edge, tol: f32) -> bool {
    match (a, b) {
        (Edge::Horizontal(y, x0, x1), Edge::Vertical(x, y0, y1))
        | (Edge::Vertical(x, y0, y1), Edge::Horizontal(y, x0, x1)) => {
            *x >= x0 - tol && *x <= x1 + tol && *y >= y0 - tol && *y <= y1 + tol
        }
        (Edge::Horizontal(ya, a0, a1), Edge::Horizontal(yb, b0, b1))
        | (Edge::Vertical(ya, a0, a1), Edge::Vertical(yb, b0, b1)) => {
            (ya - yb).abs() <= tol && *a0 <= b1 + tol && *b0 <= a1 + tol
        }
    }
}

fn connected_components(edges: &[Edge], tol: f32) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..edges.len()).collect();

    fn find(parent: &mut [usize], i: usize) -> usize {
        let mut root = i;
        while parent[root] != root {
            root = parent[root];
        }
        let mut cur = i;
        while parent[cur] != root {
            let next = parent[cur];
            parent[cur] = root;
            cur = next;
        }
        root
    }

    for i in 0..edges.len() {
        for j in (i + 1)..edges.len() {
            if touches(&edges[i], &edges[j], tol) {
                let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                if a != b {
                    parent[b] = a;
                }
            }
        }
    }

    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    for i in 0..edges.len() {
        let root = find(&mut parent, i);
        match groups.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(i),
            None => groups.push((root, vec![i])),
        }
    }
    groups.into_iter().map(|(_, members)| members).collect()
}

/// Returns the table's top edge (for ordering) and its grid.
fn build_lattice(edges: &[Edge], cells: &[TextCell], tol: f32) -> Option<(f32, CellGrid)> {
    let xs = cluster(
        edges.iter().filter_map(|e| match e {
            Edge::Vertical(x, ..) => Some(*x),
            _ => None,
        }),
        tol,
    );
    let ys = cluster(
        edges.iter().filter_map(|e| match e {
            Edge::Horizontal(y, ..) => Some(*y),
            _ => None,
        }),
        tol,
    );
    if xs.len() < 2 || ys.len() < 2 {
        return None;
    }
    let n_cols = xs.len() - 1;
    let n_rows = ys.len() - 1;
    if n_cols * n_rows < 2 {
        return None;
    }

    let mut texts: Vec<Vec<Vec<&TextCell>>> = vec![vec![Vec::new(); n_cols]; n_rows];
    for cell in cells {
        let (cx, cy) = (cell.center_x(), cell.center_y());
        let col = xs.windows(2).position(|w| cx >= w[0] && cx < w[1]);
        let row = ys.windows(2).position(|w| cy >= w[0] && cy < w[1]);
        if let (Some(r), Some(c)) = (row, col) {
            texts[r][c].push(cell);
        }
    }

    let grid = texts
        .into_iter()
        .map(|row| row.into_iter().map(join_cell_text).collect())
        .collect();
    Some((ys[0], grid))
}

fn join_cell_text(mut parts: Vec<&TextCell>) -> Option<String> {
    if parts.is_empty() {
        return None;
    }
    parts.sort_by(|a, b| reading_order(a, b));
    let text = parts
        .iter()
        .map(|c| c.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Sort values and merge those closer than `tol` into their running mean.
fn cluster(values: impl Iterator<Item = f32>, tol: f32) -> Vec<f32> {
    let mut sorted: Vec<f32> = values.collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mut out: Vec<(f32, usize)> = Vec::new();
    for v in sorted {
        match out.last_mut() {
            Some((mean, n)) if (v - *mean).abs() <= tol => {
                *mean = (*mean * *n as f32 + v) / (*n as f32 + 1.0);
                *n += 1;
            }
            _ => out.push((v, 1)),
        }
    }
    out.into_iter().map(|(mean, _)| mean).collect()
}

fn reading_order(a: &TextCell, b: &TextCell) -> Ordering {
    a.top
        .partial_cmp(&b.top)
        .unwrap_or(Ordering::Equal)
        .then(a.left.partial_cmp(&b.left).unwrap_or(Ordering::Equal))
}

// ── Stream ───────────────────────────────────────────────────────────────────

/// Detect borderless tables from text alignment alone.
pub fn stream_tables(cells: &[TextCell], settings: &StreamSettings) -> Vec<CellGrid> {
    let cells: Vec<&TextCell> = cells.iter().filter(|c| !c.text.trim().is_empty()).collect();
    if cells.len() < settings.min_cells {
        return Vec::new();
    }

    let rows = cluster_rows(&cells, settings.row_tolerance);
    find_regions(&rows, settings)
        .into_iter()
        .filter_map(|region| build_stream(&region, settings))
        .collect()
}

fn cluster_rows<'a>(cells: &[&'a TextCell], tolerance: f32) -> Vec<Vec<&'a TextCell>> {
    let mut sorted = cells.to_vec();
    sorted.sort_by(|a, b| reading_order(a, b));

    let mut rows: Vec<Vec<&TextCell>> = Vec::new();
    for cell in sorted {
        let found = rows.iter_mut().find(|row| {
            row.first()
                .is_some_and(|first| (cell.center_y() - first.center_y()).abs() <= tolerance)
        });
        match found {
            Some(row) => row.push(cell),
            None => rows.push(vec![cell]),
        }
    }

    for row in &mut rows {
        row.sort_by(|a, b| a.left.partial_cmp(&b.left).unwrap_or(Ordering::Equal));
    }
    rows.sort_by(|a, b| {
        let ay = a.first().map(|c| c.top).unwrap_or(0.0);
        let by = b.first().map(|c| c.top).unwrap_or(0.0);
        ay.partial_cmp(&by).unwrap_or(Ordering::Equal)
    });
    rows
}

/// Consecutive rows whose cell counts stay within one of each other.
fn find_regions<'a>(
    rows: &[Vec<&'a TextCell>],
    settings: &StreamSettings,
) -> Vec<Vec<Vec<&'a TextCell>>> {
    let mut regions = Vec::new();
    let mut current: Vec<Vec<&TextCell>> = Vec::new();
    let mut expected: Option<usize> = None;

    let mut close = |current: &mut Vec<Vec<&'a TextCell>>| {
        let cell_count: usize = current.iter().map(Vec::len).sum();
        if current.len() >= settings.min_rows && cell_count >= settings.min_cells {
            regions.push(std::mem::take(current));
        } else {
            current.clear();
        }
    };

    for row in rows {
        if row.len() < settings.min_cols {
            close(&mut current);
            expected = None;
            continue;
        }
        match expected {
            Some(n) if row.len().abs_diff(n) <= 1 => current.push(row.clone()),
            _ => {
                close(&mut current);
                current.push(row.clone());
                expected = Some(row.len());
            }
        }
    }
    close(&mut current);

    regions
}

fn build_stream(region: &[Vec<&TextCell>], settings: &StreamSettings) -> Option<CellGrid> {
    let lefts = region.iter().flat_map(|row| row.iter().map(|c| c.left));
    let mut bounds = column_starts(lefts, settings.col_tolerance);
    let n_cols = bounds.len();
    if n_cols < settings.min_cols {
        return None;
    }
    bounds.push(f32::INFINITY);

    let grid = region
        .iter()
        .map(|row| {
            let mut out: Vec<Vec<&TextCell>> = vec![Vec::new(); n_cols];
            for cell in row {
                let col = bounds
                    .windows(2)
                    .position(|w| cell.center_x() >= w[0] && cell.center_x() < w[1])
                    .unwrap_or(0);
                out[col].push(cell);
            }
            out.into_iter().map(join_cell_text).collect()
        })
        .collect();
    Some(grid)
}

/// Left edges that start a new column: sorted, merged within `tol`, keeping the leftmost.
fn column_starts(lefts: impl Iterator<Item = f32>, tol: f32) -> Vec<f32> {
    let mut sorted: Vec<f32> = lefts.collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mut starts: Vec<f32> = Vec::new();
    for x in sorted {
        match starts.last() {
            Some(&last) if x - last <= tol => {}
            _ => starts.push(x),
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 2×2 bordered table at (100,100)-(300,160) with 30pt rows.
    fn bordered_rulings() -> Vec<Ruling> {
        vec![
            Ruling::new(100.0, 100.0, 300.0, 100.5),
            Ruling::new(100.0, 130.0, 300.0, 130.5),
            Ruling::new(100.0, 160.0, 300.0, 160.5),
            Ruling::new(100.0, 100.0, 100.5, 160.0),
            Ruling::new(200.0, 100.0, 200.5, 160.0),
            Ruling::new(300.0, 100.0, 300.5, 160.0),
        ]
    }

    fn cell(text: &str, left: f32, top: f32) -> TextCell {
        TextCell::new(text, left, top, left + 8.0 * text.len() as f32, top + 10.0)
    }

    #[test]
    fn lattice_fills_bordered_grid() {
        let cells = vec![
            cell("Name", 110.0, 108.0),
            cell("Qty", 210.0, 108.0),
            cell("Apple", 110.0, 138.0),
            cell("3", 210.0, 138.0),
            cell("outside", 400.0, 400.0),
        ];
        let tables = lattice_tables(&bordered_rulings(), &cells, &LatticeSettings::default());
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0],
            vec![
                vec![Some("Name".into()), Some("Qty".into())],
                vec![Some("Apple".into()), Some("3".into())],
            ]
        );
    }

    #[test]
    fn lattice_accepts_rectangle_cells() {
        let rulings = vec![
            Ruling::new(0.0, 0.0, 50.0, 20.0),
            Ruling::new(50.0, 0.0, 100.0, 20.0),
        ];
        let cells = vec![cell("a", 10.0, 5.0), cell("b", 60.0, 5.0)];
        let tables = lattice_tables(&rulings, &cells, &LatticeSettings::default());
        assert_eq!(tables, vec![vec![vec![Some("a".into()), Some("b".into())]]]);
    }

    #[test]
    fn lattice_ignores_lone_underline() {
        let rulings = vec![Ruling::new(10.0, 50.0, 200.0, 50.5)];
        assert!(lattice_tables(&rulings, &[], &LatticeSettings::default()).is_empty());
    }

    #[test]
    fn lattice_separates_distant_tables() {
        let mut rulings = bordered_rulings();
        rulings.extend(
            bordered_rulings()
                .into_iter()
                .map(|r| Ruling::new(r.left, r.top + 300.0, r.right, r.bottom + 300.0)),
        );
        let tables = lattice_tables(&rulings, &[], &LatticeSettings::default());
        assert_eq!(tables.len(), 2);
        assert!(tables[0].iter().flatten().all(Option::is_none));
    }

    #[test]
    fn stream_finds_aligned_block() {
        let cells = vec![
            cell("City", 50.0, 100.0),
            cell("Pop", 150.0, 100.0),
            cell("Area", 250.0, 100.0),
            cell("Oslo", 50.0, 115.0),
            cell("700k", 150.0, 115.0),
            cell("454", 250.0, 115.0),
            cell("Bergen", 50.0, 130.0),
            cell("285k", 150.0, 130.0),
            cell("465", 250.0, 130.0),
        ];
        let tables = stream_tables(&cells, &StreamSettings::default());
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 3);
        assert_eq!(tables[0][2][0].as_deref(), Some("Bergen"));
        assert_eq!(tables[0][1][1].as_deref(), Some("700k"));
    }

    #[test]
    fn stream_ignores_prose() {
        let cells = vec![
            cell("A paragraph of running text", 50.0, 100.0),
            cell("that wraps onto a second line", 50.0, 115.0),
            cell("and a third.", 50.0, 130.0),
        ];
        assert!(stream_tables(&cells, &StreamSettings::default()).is_empty());
    }

    #[test]
    fn relaxed_settings_accept_two_by_two() {
        let cells = vec![
            cell("k", 50.0, 100.0),
            cell("v", 150.0, 100.0),
            cell("x", 50.0, 115.0),
            cell("1", 150.0, 115.0),
        ];
        assert!(stream_tables(&cells, &StreamSettings::default()).is_empty());
        assert_eq!(stream_tables(&cells, &StreamSettings::relaxed()).len(), 1);
    }

    #[test]
    fn cluster_merges_close_values() {
        let out = cluster([10.0, 10.4, 50.0, 11.0].into_iter(), 1.5);
        assert_eq!(out.len(), 2);
        assert!((out[1] - 50.0).abs() < f32::EPSILON);
    }
}
