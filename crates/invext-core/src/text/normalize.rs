//! Whitespace and control-character cleanup for extracted page text.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::document::Document;

lazy_static! {
    static ref LINE_ENDINGS: Regex = Regex::new(r"\r\n?").unwrap();

    static ref CONTROL_CHARS: Regex = Regex::new(r"[\x00\x0C]").unwrap();

    static ref TRAILING_BLANKS: Regex = Regex::new(r"(?m)[ \t]+$").unwrap();

    static ref BLANK_LINE_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();
}

/// Clean the text of a single page.
///
/// A page with visible text never comes back blank.
pub fn normalize_page_text(input: &str) -> String {
    let text = LINE_ENDINGS.replace_all(input, "\n");
    let text = CONTROL_CHARS.replace_all(&text, "");
    let text = TRAILING_BLANKS.replace_all(&text, "");
    let text = BLANK_LINE_RUNS.replace_all(&text, "\n\n");
    let cleaned = text.trim_matches('\n').to_string();

    // Only NULs were holding the page open.
    if cleaned.trim().is_empty() && !input.trim().is_empty() {
        return input.to_string();
    }
    cleaned
}

/// Normalize every page of a document in place.
pub fn normalize_document(document: &mut Document) {
    for page in document.pages.iter_mut() {
        page.text = normalize_page_text(&page.text);
    }
}
