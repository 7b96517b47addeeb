//! Pattern-based markdown stripping.
//!
//! This is not a markdown parser: each construct is removed with a single
//! substitution, in an order where earlier passes cannot create matches for
//! later ones.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FENCED_CODE: Regex = Regex::new(r"(?s)```[^`]*```").expect("fenced code pattern");
    static ref BOLD_STAR: Regex = Regex::new(r"\*{1,2}([^*]+)\*{1,2}").expect("bold pattern");
    static ref BOLD_UNDERSCORE: Regex =
        Regex::new(r"(?m)(^|\s)_{1,2}([^_\s][^_]*)_{1,2}\b").expect("italic pattern");
    static ref LINK: Regex = Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("link pattern");
    static ref INLINE_CODE: Regex = Regex::new(r"`([^`]+)`").expect("inline code pattern");
    static ref LINE_MARKER: Regex =
        Regex::new(r"(?m)^[ \t]*(?:(?:#{1,6}|[-*+]|\d+\.)(?:[ \t]+|$))+").expect("line marker pattern");
}

/// Strip markdown syntax, keeping link text and inline code contents.
pub fn strip_markdown(text: &str) -> String {
    // Fenced blocks go first so their contents never reach the inline passes.
    let text = FENCED_CODE.replace_all(text, "");
    let text = LINE_MARKER.replace_all(&text, "");
    let text = LINK.replace_all(&text, "$1");
    let text = BOLD_STAR.replace_all(&text, "$1");
    let text = BOLD_UNDERSCORE.replace_all(&text, "${1}${2}");
    let text = INLINE_CODE.replace_all(&text, "$1");
    text.into_owned()
}

/// Strip heading, bullet and numbered-list markers at the start of each
/// line, including stacked ones such as `1. - item`.
pub fn strip_line_markers(text: &str) -> String {
    LINE_MARKER.replace_all(text, "").into_owned()
}
