//! Plain-text presentation of replies.

use std::sync::OnceLock;

use regex::RegexSet;
use unicode_width::UnicodeWidthStr;

pub const DEFAULT_WRAP_WIDTH: usize = 100;

fn markdown_patterns() -> &'static RegexSet {
    static CACHED: OnceLock<RegexSet> = OnceLock::new();
    CACHED.get_or_init(|| {
        RegexSet::new([
            r"(?m)^\s*#{1,6}\s",      // headers
            r"(?m)^\s*>\s",           // blockquotes
            r"\[.*\]\(.*\)",          // links
            r"\*\*.*\*\*",            // bold
            r"\*.*\*",                // italic
            r"`.*`",                  // inline code
            r"(?m)^\s*-{3,}\s*$",     // horizontal rules
            r"(?m)^\s*\d+\.\s",       // ordered lists
            r"(?m)^\s*[-*+]\s",       // unordered lists
        ])
        .expect("markdown patterns must compile")
    })
}

/// True when `text` contains any common markdown syntax.
pub fn is_markdown(text: &str) -> bool {
    markdown_patterns().is_match(text)
}

/// Greedy word wrap by terminal display width. Paragraph breaks are kept;
/// words wider than `width` stay whole.
pub fn wrap_text(text: &str, width: usize) -> String {
    let width = width.max(1);
    text.lines()
        .map(|line| wrap_line(line, width))
        .collect::<Vec<_>>()
        .join("\n")
}

fn wrap_line(line: &str, width: usize) -> String {
    let mut wrapped = String::new();
    let mut current = 0;

    for word in line.split_whitespace() {
        let len = word.width();
        if current > 0 && current + 1 + len > width {
            wrapped.push('\n');
            current = 0;
        } else if current > 0 {
            wrapped.push(' ');
            current += 1;
        }
        wrapped.push_str(word);
        current += len;
    }
    wrapped
}

/// Markdown is printed verbatim; plain prose is wrapped to `width`.
pub fn format_reply(text: &str, width: usize) -> String {
    if is_markdown(text) {
        text.to_string()
    } else {
        wrap_text(text, width)
    }
}
