//! Per-candidate validation, filename filtering, and normalization.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use nexus_shared::ExtractConfig;

/// Conservative URL-safe character set for a whole candidate.
static SAFE_CHARS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9\-._~:/?#\[\]@!$&'()*+,;=%]+$").expect("valid regex")
});

/// An explicit `scheme://` prefix.
static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z]+)://").expect("valid regex"));

/// Scheme-less text that still looks like `label.tld`.
static BARE_DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("valid regex"));

/// Sentence punctuation that never ends a pasted URL.
const TRAILING_PUNCT: [char; 7] = ['.', ',', ';', ':', '!', '?', ')'];

/// Strip trailing sentence punctuation.
pub(crate) fn trim_trailing_punct(s: &str) -> &str {
    s.trim_end_matches(TRAILING_PUNCT)
}

/// Stateless checks parameterized by the extraction config.
#[derive(Debug, Clone)]
pub(crate) struct Validator {
    max_url_len: usize,
    protocols: HashSet<String>,
    blocked_extensions: HashSet<String>,
}

impl Validator {
    pub(crate) fn new(config: &ExtractConfig) -> Self {
        Self {
            max_url_len: config.max_url_len,
            protocols: config.supported_protocols.iter().cloned().collect(),
            blocked_extensions: config.blocked_extensions.iter().cloned().collect(),
        }
    }

    /// Structural validity of a raw candidate (scheme optional).
    pub(crate) fn is_valid(&self, candidate: &str) -> bool {
        if candidate.len() <= 3 || candidate.len() > self.max_url_len {
            return false;
        }
        if !candidate.contains('.') || !SAFE_CHARS_RE.is_match(candidate) {
            return false;
        }

        let absolute = match SCHEME_RE.captures(candidate) {
            Some(caps) => {
                if !self.protocols.contains(&caps[1].to_ascii_lowercase()) {
                    return false;
                }
                Cow::Borrowed(candidate)
            }
            None => Cow::Owned(format!("https://{candidate}")),
        };

        let Ok(parsed) = Url::parse(&absolute) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 {
            return false;
        }
        let tld = labels[labels.len() - 1];
        tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
    }

    /// A bare `name.ext` with a non-page extension is a filename, not a URL.
    ///
    /// Never applies when the candidate carries a scheme, a `www.` prefix, or a path.
    pub(crate) fn is_probable_filename(&self, candidate: &str) -> bool {
        let path_part = candidate.split(['?', '#']).next().unwrap_or(candidate);
        let Some((_, extension)) = path_part.rsplit_once('.') else {
            return false;
        };
        if !self
            .blocked_extensions
            .contains(&extension.to_ascii_lowercase())
        {
            return false;
        }
        if SCHEME_RE.is_match(candidate) || has_www_prefix(candidate) {
            return false;
        }
        !candidate.contains('/')
    }

    /// Canonicalize to `scheme://host[path][?query][#fragment]`.
    ///
    /// Scheme and host are lower-cased; empty query and fragment parts are
    /// dropped. Returns `None` when the result does not re-parse.
    pub(crate) fn normalize(&self, candidate: &str) -> Option<String> {
        let trimmed = trim_trailing_punct(candidate.trim());
        if trimmed.is_empty() {
            return None;
        }

        let absolute = if SCHEME_RE.is_match(trimmed) {
            trimmed.to_string()
        } else if has_www_prefix(trimmed) || BARE_DOMAIN_RE.is_match(trimmed) {
            format!("https://{trimmed}")
        } else {
            return None;
        };

        Url::parse(&absolute).ok()?.host_str()?;

        let (scheme, rest) = absolute.split_once("://")?;
        let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_end);
        if authority.is_empty() {
            return None;
        }

        let (before_fragment, fragment) = match tail.split_once('#') {
            Some((head, frag)) => (head, Some(frag)),
            None => (tail, None),
        };
        let (path, query) = match before_fragment.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (before_fragment, None),
        };

        let mut out = format!(
            "{}://{}{}",
            scheme.to_ascii_lowercase(),
            lowercase_host(authority),
            path
        );
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            out.push('?');
            out.push_str(query);
        }
        if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
            out.push('#');
            out.push_str(fragment);
        }
        Some(out)
    }
}

fn has_www_prefix(s: &str) -> bool {
    s.get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("www."))
}

/// Lower-case the host (and port) of an authority, leaving userinfo intact.
fn lowercase_host(authority: &str) -> String {
    match authority.rsplit_once('@') {
        Some((userinfo, host)) => format!("{userinfo}@{}", host.to_ascii_lowercase()),
        None => authority.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> Validator {
        Validator::new(&ExtractConfig::default())
    }

    #[test]
    fn rejects_short_dotless_and_oversize() {
        let v = validator();
        assert!(!v.is_valid("a.b"));
        assert!(!v.is_valid("localhost"));
        assert!(!v.is_valid(&format!("https://a.com/{}", "x".repeat(2100))));
    }

    #[test]
    fn rejects_unsafe_characters() {
        let v = validator();
        assert!(!v.is_valid("https://a.com/<script>"));
        assert!(!v.is_valid("https://a.com/\"q\""));
    }

    #[test]
    fn enforces_scheme_allow_list() {
        let v = validator();
        assert!(v.is_valid("ftp://files.example.org"));
        assert!(v.is_valid("HTTPS://Example.COM"));
        assert!(!v.is_valid("gopher://example.org"));
        assert!(!v.is_valid("javascript://example.com"));
    }

    #[test]
    fn requires_alphabetic_tld() {
        let v = validator();
        assert!(v.is_valid("example.com"));
        assert!(v.is_valid("www.test.com/page"));
        assert!(v.is_valid("https://example.com:8080/x"));
        assert!(!v.is_valid("192.168.1.1"));
        assert!(!v.is_valid("https://example.c"));
        assert!(!v.is_valid("https://example.c0m"));
    }

    #[test]
    fn filename_detection() {
        let v = validator();
        assert!(v.is_probable_filename("notes.txt"));
        assert!(v.is_probable_filename("Report.PDF"));
        assert!(!v.is_probable_filename("https://site.com/notes.txt"));
        assert!(!v.is_probable_filename("site.com/notes.txt"));
        assert!(!v.is_probable_filename("www.example.zip"));
        assert!(!v.is_probable_filename("example.com"));
    }

    #[test]
    fn normalize_injects_https_and_strips_punctuation() {
        let v = validator();
        assert_eq!(
            v.normalize("www.test.com/page)."),
            Some("https://www.test.com/page".into())
        );
        assert_eq!(v.normalize("example.com"), Some("https://example.com".into()));
        assert_eq!(v.normalize("not a url"), None);
        assert_eq!(v.normalize("..."), None);
    }

    #[test]
    fn normalize_lowercases_scheme_and_host_only() {
        let v = validator();
        assert_eq!(
            v.normalize("HTTP://User@Example.COM:8080/Path/To?Q=1#Frag"),
            Some("http://User@example.com:8080/Path/To?Q=1#Frag".into())
        );
    }

    #[test]
    fn normalize_drops_empty_query_and_fragment() {
        let v = validator();
        assert_eq!(
            v.normalize("https://a.com/x?#"),
            Some("https://a.com/x".into())
        );
        assert_eq!(
            v.normalize("https://a.com/#top"),
            Some("https://a.com/#top".into())
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let v = validator();
        for raw in [
            "www.Test.com/page",
            "https://a.com/x?y=1#z",
            "bit.ly/abc123",
            "ftp://Files.example.org/pub/",
        ] {
            let once = v.normalize(raw).expect("normalizes");
            assert_eq!(v.normalize(&once), Some(once.clone()), "{raw}");
        }
    }
}
