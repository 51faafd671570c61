// src/utils/text.rs

//! Text helpers for the line/column layout of schedule pages.

use std::borrow::Cow;

use regex::Regex;

/// Decode fetched bytes, replacing invalid UTF-8 sequences.
pub fn decode_body(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Remove every match of the tag pattern.
pub fn strip_tags<'a>(tag: &Regex, s: &'a str) -> Cow<'a, str> {
    tag.replace_all(s, "")
}

/// Decode HTML entities; non-breaking spaces become plain spaces.
pub fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).replace('\u{a0}', " ")
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Display text of a markup fragment: tags stripped, entities decoded, whitespace collapsed.
pub fn display_text(tag: &Regex, fragment: &str) -> String {
    normalize_whitespace(&decode_entities(&strip_tags(tag, fragment)))
}

/// Trimmed slice of `line` between character columns `start` and `end`.
///
/// Columns past the end of the line yield an empty string; `None` reads to end of line.
pub fn column(line: &str, start: usize, end: Option<usize>) -> &str {
    let from = byte_index(line, start);
    let to = end.map_or(line.len(), |e| byte_index(line, e)).max(from);
    line.get(from..to).unwrap_or("").trim()
}

fn byte_index(line: &str, chars: usize) -> usize {
    line.char_indices()
        .nth(chars)
        .map_or(line.len(), |(i, _)| i)
}
