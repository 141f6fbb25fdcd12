//! Layout heuristics: turn positioned text lines into Markdown.
//!
//! The collaborator reports each page as a list of [`TextLine`]s carrying
//! the largest font size seen on the line. The only structure recovered
//! here is what font size and leading glyphs give away for free:
//!
//! - lines noticeably larger than the body text become headings,
//! - bullet glyphs become `- ` list items,
//! - vertical gaps larger than the line spacing start a new paragraph.
//!
//! Anything smarter (columns, reading order, figures) is the collaborator's
//! business.

/// One visual line of text on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Line text without the trailing newline.
    pub text: String,
    /// Largest font size on the line, in points.
    pub font_size: f32,
    /// Distance from the top of the page to the line's baseline, in points.
    /// `None` when the collaborator cannot tell.
    pub top: Option<f32>,
}

impl TextLine {
    pub fn new(text: impl Into<String>, font_size: f32) -> Self {
        Self {
            text: text.into(),
            font_size,
            top: None,
        }
    }

    pub fn at(mut self, top: f32) -> Self {
        self.top = Some(top);
        self
    }
}

const BULLETS: [char; 6] = ['•', '◦', '▪', '‣', '●', '–'];

/// Size ratios (line / body) for `#`, `##` and `###`.
const HEADING_RATIOS: [(f32, &str); 3] = [(1.6, "#"), (1.3, "##"), (1.15, "###")];

/// The most common font size across `lines`, weighted by character count.
///
/// Sizes are bucketed to half a point so that 10.02 and 9.98 agree.
pub fn body_font_size(lines: &[TextLine]) -> Option<f32> {
    let mut buckets: Vec<(i32, usize)> = Vec::new();
    for line in lines {
        let weight = line.text.chars().filter(|c| !c.is_whitespace()).count();
        if weight == 0 || line.font_size <= 0.0 {
            continue;
        }
        let key = (line.font_size * 2.0).round() as i32;
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, w)) => *w += weight,
            None => buckets.push((key, weight)),
        }
    }
    buckets
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(key, _)| key as f32 / 2.0)
}

/// Render a sequence of pages to one Markdown document.
///
/// The body size is computed over the whole document so that a page made
/// only of a large title is still recognised as a heading page.
pub fn document_to_markdown(pages: &[Vec<TextLine>]) -> String {
    let all: Vec<TextLine> = pages.iter().flatten().cloned().collect();
    let body = body_font_size(&all);
    pages
        .iter()
        .map(|lines| render_lines(lines, body))
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render a single page using its own body size.
pub fn page_to_markdown(lines: &[TextLine]) -> String {
    render_lines(lines, body_font_size(lines))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Last {
    /// Start of page, a heading, or an explicit blank line.
    Break,
    Paragraph,
    ListItem,
}

fn render_lines(lines: &[TextLine], body: Option<f32>) -> String {
    let mut out = String::new();
    let mut prev: Option<&TextLine> = None;
    let mut last = Last::Break;

    for line in lines {
        let text = line.text.trim();
        if text.is_empty() {
            last = Last::Break;
            prev = None;
            continue;
        }

        if let Some(marks) = heading_marks(line, body) {
            push_block(&mut out, &format!("{marks} {}", collapse_spaces(text)));
            last = Last::Break;
        } else if let Some(item) = strip_bullet(text) {
            let separator = if last == Last::ListItem { "\n" } else { "\n\n" };
            push_with(&mut out, separator, &format!("- {item}"));
            last = Last::ListItem;
        } else {
            let continues = last == Last::Paragraph && !prev.is_some_and(|p| is_paragraph_gap(p, line));
            let separator = if continues { "\n" } else { "\n\n" };
            push_with(&mut out, separator, text);
            last = Last::Paragraph;
        }
        prev = Some(line);
    }

    out
}

fn push_with(out: &mut String, separator: &str, text: &str) {
    if !out.is_empty() {
        out.push_str(separator);
    }
    out.push_str(text);
}

fn push_block(out: &mut String, block: &str) {
    push_with(out, "\n\n", block);
}

fn heading_marks(line: &TextLine, body: Option<f32>) -> Option<&'static str> {
    let body = body?;
    // Long lines in a big font are pull quotes or title pages, not headings.
    if line.text.chars().count() > 120 {
        return None;
    }
    let ratio = line.font_size / body;
    HEADING_RATIOS
        .iter()
        .find(|(min, _)| ratio >= *min)
        .map(|(_, marks)| *marks)
}

fn strip_bullet(text: &str) -> Option<&str> {
    let mut chars = text.chars();
    let first = chars.next()?;
    let rest = chars.as_str();
    let is_bullet = BULLETS.contains(&first) || (first == '-' && rest.starts_with(' '));
    if is_bullet {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// A gap of more than 1.5 line heights between baselines starts a new paragraph.
fn is_paragraph_gap(prev: &TextLine, line: &TextLine) -> bool {
    match (prev.top, line.top) {
        (Some(a), Some(b)) => {
            let leading = prev.font_size.max(line.font_size).max(1.0) * 1.5;
            (b - a) > leading * 1.2
        }
        _ => false,
    }
}

fn collapse_spaces(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
