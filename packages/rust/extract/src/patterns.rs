//! Recovery patterns and span bookkeeping for the multi-pattern extractor.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Characters allowed inside a matched URL run.
const URL_CHAR: &str = r#"[^\s<>"{}|\\^`\[\]]"#;

/// Which heuristic produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    Concatenated,
    Shortened,
    Protocol,
    Www,
    Domain,
}

impl PatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concatenated => "concatenated",
            Self::Shortened => "shortened",
            Self::Protocol => "protocol",
            Self::Www => "www",
            Self::Domain => "domain",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw substring flagged by one heuristic, with its byte span in the
/// preprocessed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub kind: PatternKind,
}

impl CandidateSpan {
    fn contains(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end
    }
}

/// The ordered, configuration-dependent pattern set (everything after
/// concatenation splitting).
#[derive(Debug)]
pub(crate) struct PatternSet {
    ordered: Vec<(PatternKind, Regex)>,
}

impl PatternSet {
    /// Compile the patterns for the given shortener hosts and schemes.
    pub(crate) fn compile(
        shorteners: &[String],
        protocols: &[String],
    ) -> Result<Self, regex::Error> {
        let mut ordered = Vec::with_capacity(4);

        if !shorteners.is_empty() {
            let hosts = shorteners
                .iter()
                .map(|h| regex::escape(h))
                .collect::<Vec<_>>()
                .join("|");
            ordered.push((
                PatternKind::Shortened,
                Regex::new(&format!(r"(?i)(?:{hosts})/[a-zA-Z0-9]+"))?,
            ));
        }

        if !protocols.is_empty() {
            // Longest first so `ftps` is tried before `ftp`.
            let mut schemes: Vec<&String> = protocols.iter().collect();
            schemes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            let schemes = schemes
                .iter()
                .map(|s| regex::escape(s))
                .collect::<Vec<_>>()
                .join("|");
            ordered.push((
                PatternKind::Protocol,
                Regex::new(&format!(r"(?i)(?:{schemes})://{URL_CHAR}+"))?,
            ));
        }

        ordered.push((
            PatternKind::Www,
            Regex::new(&format!(r"(?i)www\.{URL_CHAR}+"))?,
        ));

        let label = r"[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?";
        ordered.push((
            PatternKind::Domain,
            Regex::new(&format!(
                r"(?i){label}(?:\.{label})*\.[a-z]{{2,}}(?:/{URL_CHAR}*)?"
            ))?,
        ));

        Ok(Self { ordered })
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (PatternKind, &Regex)> {
        self.ordered.iter().map(|(kind, re)| (*kind, re))
    }
}

/// Single combined pattern used when the enhanced extractor is disabled or fails.
pub(crate) static FALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)https?://{URL_CHAR}+|www\.{URL_CHAR}+|[a-z0-9-]+\.[a-z]{{2,}}(?:/{URL_CHAR}*)?"
    ))
    .expect("fallback regex")
});

/// Claimed spans, kept pairwise non-nested.
///
/// A new span inside (or equal to) an existing one is rejected; a new span
/// that strictly contains existing ones replaces them.
#[derive(Debug, Default)]
pub(crate) struct SpanSet {
    spans: Vec<CandidateSpan>,
}

impl SpanSet {
    /// Offer a span; returns whether it was kept.
    pub(crate) fn offer(&mut self, span: CandidateSpan) -> bool {
        if self.spans.iter().any(|s| s.contains(span.start, span.end)) {
            return false;
        }
        self.spans
            .retain(|s| !(span.start <= s.start && s.end <= span.end));
        self.spans.push(span);
        true
    }

    pub(crate) fn into_spans(self) -> Vec<CandidateSpan> {
        self.spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> PatternSet {
        PatternSet::compile(
            &["bit.ly".into(), "t.co".into()],
            &["http".into(), "https".into(), "ftp".into(), "ftps".into()],
        )
        .expect("compile")
    }

    fn matches(kind: PatternKind, text: &str) -> Vec<String> {
        let patterns = set();
        let (_, re) = patterns
            .iter()
            .find(|(k, _)| *k == kind)
            .expect("pattern present");
        re.find_iter(text).map(|m| m.as_str().to_string()).collect()
    }

    #[test]
    fn order_is_fixed() {
        let kinds: Vec<PatternKind> = set().iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                PatternKind::Shortened,
                PatternKind::Protocol,
                PatternKind::Www,
                PatternKind::Domain
            ]
        );
    }

    #[test]
    fn shortened_requires_path() {
        assert_eq!(matches(PatternKind::Shortened, "go to bit.ly/3xYz now"), vec!["bit.ly/3xYz"]);
        assert!(matches(PatternKind::Shortened, "bit.ly alone").is_empty());
    }

    #[test]
    fn protocol_matches_ftps() {
        assert_eq!(
            matches(PatternKind::Protocol, "get ftps://files.example.org/a.iso"),
            vec!["ftps://files.example.org/a.iso"]
        );
        assert!(matches(PatternKind::Protocol, "mailto://x.com").is_empty());
    }

    #[test]
    fn protocol_stops_at_quotes_and_brackets() {
        assert_eq!(
            matches(PatternKind::Protocol, r#"<a href="https://a.com/x">"#),
            vec!["https://a.com/x"]
        );
    }

    #[test]
    fn domain_needs_alpha_tld() {
        assert_eq!(matches(PatternKind::Domain, "visit docs.rs/regex"), vec!["docs.rs/regex"]);
        assert!(matches(PatternKind::Domain, "version 1.2.3").is_empty());
    }

    #[test]
    fn span_set_rejects_nested_and_replaces_enclosed() {
        let mut spans = SpanSet::default();
        let outer = CandidateSpan {
            text: "https://a.com/x".into(),
            start: 0,
            end: 15,
            kind: PatternKind::Protocol,
        };
        let inner = CandidateSpan {
            text: "a.com/x".into(),
            start: 8,
            end: 15,
            kind: PatternKind::Domain,
        };
        assert!(spans.offer(outer.clone()));
        assert!(!spans.offer(inner.clone()));

        let mut spans = SpanSet::default();
        assert!(spans.offer(inner));
        assert!(spans.offer(outer.clone()));
        assert_eq!(spans.into_spans(), vec![outer]);
    }

    #[test]
    fn fallback_covers_three_shapes() {
        let found: Vec<&str> = FALLBACK_RE
            .find_iter("https://a.com www.b.org c.net/d")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["https://a.com", "www.b.org", "c.net/d"]);
    }
}
