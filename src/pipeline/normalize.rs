//! Text normalisation: deterministic cleanup of extracted page text.
//!
//! PDF text streams carry artefacts of the typesetting rather than of the
//! content: words hyphenated at the right margin, runs of empty lines where
//! the layout had vertical whitespace, and the occasional unpaired UTF-16
//! surrogate from a broken `ToUnicode` map. Each rule is a pure function
//! so it can be tested (and re-applied) on its own.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so that both the hyphenation and the
//! blank-line rules only need to look for `\n`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply every cleanup rule before the text is written.
///
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Join words split by a line-end hyphen (when `dehyphenate`)
/// 3. Collapse 3+ consecutive newlines down to 2
pub fn normalize(input: &str, dehyphenate: bool) -> String {
    let s = normalise_line_endings(input);
    let s = if dehyphenate {
        clean_hyphenation(&s)
    } else {
        s
    };
    collapse_blank_lines(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Join hyphenated words ────────────────────────────────────────────

/// Join words broken across lines by a trailing hyphen (`exam-\nple` → `example`).
///
/// A `-\n` pair is removed when the characters on both sides of it, as they
/// appear in the input, are word characters. Neighbours are judged on the
/// input rather than on the partially joined output, so `a-\nb-\nc` becomes
/// `abc` in one pass and a second pass never finds anything new.
pub fn clean_hyphenation(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        let breaks_word = chars[i] == '-'
            && chars.get(i + 1) == Some(&'\n')
            && i > 0
            && is_word_char(chars[i - 1])
            && chars.get(i + 2).is_some_and(|c| is_word_char(*c));
        if breaks_word {
            i += 2;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// ── Rule 3: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Collapse three or more consecutive newlines into exactly one blank line.
pub fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Surrogates ───────────────────────────────────────────────────────────────

/// Decode UTF-16 code units, dropping every unpaired surrogate (0xD800–0xDFFF).
///
/// pdfium reports page characters as UTF-16 units; a broken font map can
/// emit a high surrogate with no low half. Well-formed pairs are kept.
pub fn remove_surrogates(units: &[u16]) -> String {
    char::decode_utf16(units.iter().copied())
        .filter_map(Result::ok)
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────
