#![forbid(unsafe_code)]

//! Whitespace normalization for free-text metadata fields.

use regex::Regex;
use std::sync::LazyLock;

/// Placeholder persisted for title/description fields that carry no text.
pub const MISSING_FIELD: &str = "N/A";

static RUN_OF_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid whitespace pattern"));

/// Replaces every run of two or more whitespace characters with one space and
/// trims both ends. Single whitespace characters (including a lone tab) are
/// left untouched.
pub fn collapse_whitespace(text: &str) -> String {
    RUN_OF_WHITESPACE
        .replace_all(text, " ")
        .trim()
        .to_string()
}

/// Normalizes a title or description. Absent, empty and whitespace-only input
/// all map to [`MISSING_FIELD`].
pub fn normalize(text: Option<&str>) -> String {
    let Some(text) = text else {
        return MISSING_FIELD.to_string();
    };
    let collapsed = collapse_whitespace(text);
    if collapsed.is_empty() {
        MISSING_FIELD.to_string()
    } else {
        collapsed
    }
}
