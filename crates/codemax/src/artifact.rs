//! Detection of a complete HTML document inside model output

use crate::creations::Creation;
use llm::{Message, MessageRole};
use regex::Regex;
use std::sync::OnceLock;

/// A DOCTYPE-prefixed document, or a bare `<html` element, up to the first
/// closing `</html>`. Case-insensitive, dot matches newline.
const ARTIFACT_PATTERN: &str = r"(?is)<!DOCTYPE html>.*?</html>|<html.*?</html>";

fn artifact_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(ARTIFACT_PATTERN).expect("artifact pattern is valid"))
}

/// Return the earliest complete HTML document in `text`, verbatim.
///
/// No validation is performed beyond locating the markers: a document that
/// lacks either the opening or the closing marker is not found.
pub fn extract_html(text: &str) -> Option<&str> {
    artifact_regex().find(text).map(|m| m.as_str())
}

/// Build a temporary preview from any model turn, outside the history
pub fn extract_from_turn(message: &Message) -> Option<Creation> {
    if message.role != MessageRole::Model {
        return None;
    }
    let text = message.text();
    extract_html(&text).map(Creation::temporary)
}
