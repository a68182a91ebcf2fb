//! Input preprocessing ahead of pattern matching.
//!
//! Each pass is a function `&str -> String` applied in sequence. After the
//! pipeline runs the text is printable ASCII only, so every later stage can
//! slice it by byte offset.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

/// Run the full preprocessing pipeline on raw pasted text.
pub(crate) fn run_pipeline(text: &str) -> String {
    let mut result = strip_zero_width(text);

    result = flatten_line_breaks(&result);
    result = strip_non_printable(&result);
    result = collapse_spaces(&result);

    result.trim().to_string()
}

/// Cut `text` to at most `max_chars` characters, warning when anything is dropped.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            warn!(
                length = text.chars().count(),
                limit = max_chars,
                "input exceeds extraction limit, truncating"
            );
            &text[..cut]
        }
        None => text,
    }
}

// ---------------------------------------------------------------------------
// Pass 1: Zero-width and no-break characters
// ---------------------------------------------------------------------------

fn strip_zero_width(text: &str) -> String {
    static ZERO_WIDTH_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"[\x{200B}-\x{200D}\x{202F}\x{205F}\x{3000}\x{00A0}]").expect("valid regex")
    });

    ZERO_WIDTH_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: Line breaks and tabs become spaces
// ---------------------------------------------------------------------------

fn flatten_line_breaks(text: &str) -> String {
    static BREAK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\r\n\t]+").expect("valid regex"));

    BREAK_RE.replace_all(text, " ").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: Drop anything outside printable ASCII
// ---------------------------------------------------------------------------

fn strip_non_printable(text: &str) -> String {
    static NON_PRINTABLE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\x20-\x7E]").expect("valid regex"));

    NON_PRINTABLE_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 4: Collapse runs of spaces
// ---------------------------------------------------------------------------

fn collapse_spaces(text: &str) -> String {
    static SPACE_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r" {2,}").expect("valid regex"));

    SPACE_RUN_RE.replace_all(text, " ").into_owned()
}
