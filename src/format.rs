//! Converts raw reply text into a structured display tree.
//!
//! The render layer interprets `Node` values; raw text is never treated as
//! markup, so model output cannot inject anything outside this whitelist.
//! Transformation order is fixed: fenced code blocks first, then per line a
//! bullet marker check at line start, then bold before italic, with newlines
//! becoming explicit breaks. The order is what disambiguates `*` used for
//! bullets from `*` used for emphasis.

use std::sync::LazyLock;

use regex::Regex;

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("valid regex"));
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[*-]\s+(.*)$").expect("valid regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid regex"));
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("valid regex"));

/// One element of the formatted display tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Plain(String),
    Bold(String),
    Italic(String),
    CodeBlock(String),
    /// Marks the start of a bulleted line; the renderer picks the glyph.
    Bullet,
    LineBreak,
}

/// Format raw reply text. Pure and deterministic: identical input always
/// yields the identical tree.
#[must_use]
pub fn format(text: &str) -> Vec<Node> {
    let mut out = Vec::new();
    let mut last = 0;
    for caps in CODE_RE.captures_iter(text) {
        let m = caps.get(0).expect("match 0 always present");
        format_prose(&text[last..m.start()], &mut out);
        out.push(Node::CodeBlock(caps[1].to_string()));
        last = m.end();
    }
    format_prose(&text[last..], &mut out);
    out
}

fn format_prose(text: &str, out: &mut Vec<Node>) {
    if text.is_empty() {
        return;
    }
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push(Node::LineBreak);
        }
        // Bullet detection runs before emphasis so a leading `* ` is never
        // mistaken for an italic delimiter.
        if let Some(caps) = BULLET_RE.captures(line) {
            out.push(Node::Bullet);
            format_emphasis(&caps[1], out);
        } else {
            format_emphasis(line, out);
        }
    }
}

fn format_emphasis(line: &str, out: &mut Vec<Node>) {
    let mut last = 0;
    for caps in BOLD_RE.captures_iter(line) {
        let m = caps.get(0).expect("match 0 always present");
        format_italics(&line[last..m.start()], out);
        out.push(Node::Bold(caps[1].to_string()));
        last = m.end();
    }
    format_italics(&line[last..], out);
}

fn format_italics(text: &str, out: &mut Vec<Node>) {
    let mut last = 0;
    for caps in ITALIC_RE.captures_iter(text) {
        let m = caps.get(0).expect("match 0 always present");
        push_plain(&text[last..m.start()], out);
        out.push(Node::Italic(caps[1].to_string()));
        last = m.end();
    }
    push_plain(&text[last..], out);
}

fn push_plain(text: &str, out: &mut Vec<Node>) {
    if !text.is_empty() {
        out.push(Node::Plain(text.to_string()));
    }
}
