//! Splitting of URLs pasted back-to-back with no separating whitespace.

use std::sync::LazyLock;

use regex::Regex;

use crate::patterns::{CandidateSpan, PatternKind};
use crate::validate::trim_trailing_punct;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("valid regex"));

static SCHEME_DELIM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)https?://").expect("valid regex"));

static WWW_DELIM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)www\.").expect("valid regex"));

/// Find every whitespace-free token holding glued URLs and cut it at each
/// URL start. Pieces that pass `is_valid` come back as
/// [`PatternKind::Concatenated`] spans over `text`.
///
/// Text before the first cut stays in place for the later patterns.
pub(crate) fn split_concatenated(
    text: &str,
    is_valid: impl Fn(&str) -> bool,
) -> Vec<CandidateSpan> {
    let mut spans = Vec::new();

    for token in TOKEN_RE.find_iter(text) {
        let starts = cut_points(token.as_str());

        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(token.len());
            let piece = trim_trailing_punct(&token.as_str()[start..end]);
            if piece.is_empty() || !is_valid(piece) {
                continue;
            }
            let abs_start = token.start() + start;
            spans.push(CandidateSpan {
                text: piece.to_string(),
                start: abs_start,
                end: abs_start + piece.len(),
                kind: PatternKind::Concatenated,
            });
        }
    }

    spans
}

/// Byte offsets within `token` where a glued URL begins, or nothing when the
/// token holds a single URL.
///
/// Every `http://`/`https://` is a cut. A `www.` is a cut only while the
/// piece it would end is still inside its host, so `www.` in a path or query
/// stays part of the URL.
fn cut_points(token: &str) -> Vec<usize> {
    let schemes: Vec<usize> = SCHEME_DELIM_RE.find_iter(token).map(|m| m.start()).collect();
    let wwws: Vec<usize> = WWW_DELIM_RE
        .find_iter(token)
        .map(|m| m.start())
        .filter(|&pos| !token[..pos].ends_with("://"))
        .collect();

    let mut starts: Vec<usize> = Vec::with_capacity(schemes.len() + wwws.len());
    let (mut s, mut w) = (0, 0);
    while s < schemes.len() || w < wwws.len() {
        let take_scheme = w == wwws.len() || (s < schemes.len() && schemes[s] <= wwws[w]);
        if take_scheme {
            starts.push(schemes[s]);
            s += 1;
            continue;
        }
        let pos = wwws[w];
        w += 1;
        let in_host = starts
            .last()
            .is_none_or(|&prev| within_authority(&token[prev..pos]));
        if in_host {
            starts.push(pos);
        }
    }
    starts.dedup();

    let glued_scheme = schemes.iter().any(|&pos| pos > 0);
    if starts.len() < 2 && !glued_scheme {
        return Vec::new();
    }
    starts
}

/// True when `piece` has not yet left its authority (no `/`, `?` or `#`
/// after the scheme).
fn within_authority(piece: &str) -> bool {
    let rest = piece.find("://").map_or(piece, |i| &piece[i + 3..]);
    !rest.contains(['/', '?', '#'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(spans: &[CandidateSpan]) -> Vec<&str> {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn splits_two_schemes() {
        let text = "https://a.comhttps://b.com";
        let spans = split_concatenated(text, |_| true);
        assert_eq!(texts(&spans), vec!["https://a.com", "https://b.com"]);
        assert_eq!((spans[1].start, spans[1].end), (13, 26));
        assert_eq!(&text[spans[1].start..spans[1].end], "https://b.com");
    }

    #[test]
    fn splits_www_runs_and_keeps_scheme_hosts_whole() {
        let spans = split_concatenated("x https://www.a.comwww.b.org/p y", |_| true);
        assert_eq!(texts(&spans), vec!["https://www.a.com", "www.b.org/p"]);
    }

    #[test]
    fn single_url_token_is_left_alone() {
        assert!(split_concatenated("see https://www.a.com/x?y=1 ok", |_| true).is_empty());
    }

    #[test]
    fn invalid_pieces_are_dropped_and_punctuation_trimmed() {
        let spans = split_concatenated("http://nohttps://b.com,", |p| p.contains('.'));
        assert_eq!(texts(&spans), vec!["https://b.com"]);
    }

    #[test]
    fn leading_garbage_before_first_delimiter_is_ignored() {
        let spans = split_concatenated("link:http://a.iohttp://b.io", |_| true);
        assert_eq!(texts(&spans), vec!["http://a.io", "http://b.io"]);
    }

    #[test]
    fn www_in_path_or_query_does_not_cut() {
        assert!(split_concatenated("https://github.com/acme/www.site", |_| true).is_empty());
        assert!(split_concatenated("https://docs.example.com/www.v2/intro", |_| true).is_empty());
        assert!(
            split_concatenated("see https://example.com/?ref=www.google.com", |_| true)
                .is_empty()
        );
    }

    #[test]
    fn www_after_path_of_second_url_stays_attached() {
        let spans = split_concatenated("https://a.comhttps://b.com/www.c", |_| true);
        assert_eq!(texts(&spans), vec!["https://a.com", "https://b.com/www.c"]);
    }

    #[test]
    fn single_glued_scheme_is_cut() {
        let spans = split_concatenated("Link:example.comhttps://b.com", |_| true);
        assert_eq!(texts(&spans), vec!["https://b.com"]);
        assert_eq!(spans[0].start, 16);

        let spans = split_concatenated("ftp://a.comhttp://b.com", |_| true);
        assert_eq!(texts(&spans), vec!["http://b.com"]);
    }
}
