//! URL extraction and validation engine.
//!
//! Recovers web addresses from noisy pasted text (including URLs glued
//! together with no whitespace), validates them, and emits a sorted,
//! de-duplicated list of canonical `scheme://host[path][?query][#fragment]`
//! strings. Extraction never fails: unusable input yields an empty list.
//!
//! The pipeline:
//! 1. Truncate to the configured character limit, then preprocess ([`sanitize`])
//! 2. Split concatenated URLs and blank them out of the working text
//! 3. Run the shortener, explicit-scheme, `www.` and bare-domain patterns in order
//! 4. Suppress candidates embedded at a structural boundary in a longer one
//! 5. Filter filenames, validate, normalize, sort, de-duplicate

mod concat;
mod html;
mod patterns;
mod sanitize;
mod validate;

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use nexus_shared::{ExtractConfig, NexusError, Result};

pub use patterns::{CandidateSpan, PatternKind};

use patterns::{FALLBACK_RE, PatternSet, SpanSet};
use validate::{Validator, trim_trailing_punct};

/// Wall-clock budget for the enhanced pattern passes before falling back.
const DEFAULT_PATTERN_BUDGET: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Clipboard payloads
// ---------------------------------------------------------------------------

/// What a paste or drop delivered.
#[derive(Debug, Clone)]
pub enum ClipboardPayload {
    /// Pre-resolved links; these bypass extraction entirely.
    Urls(Vec<String>),
    /// Rich text. `text` is the plain-text alternative, when the source offered one.
    Html { html: String, text: Option<String> },
    /// Plain text.
    Text(String),
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// The extraction engine. Construct once and reuse; it holds compiled patterns.
#[derive(Debug)]
pub struct Extractor {
    config: ExtractConfig,
    validator: Validator,
    /// `None` when enhanced extraction is disabled or its patterns failed to compile.
    patterns: Option<PatternSet>,
    pattern_budget: Duration,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(ExtractConfig::default())
    }
}

impl Extractor {
    /// Build an extractor from runtime configuration.
    pub fn new(config: ExtractConfig) -> Self {
        let patterns = if config.enhanced {
            match PatternSet::compile(&config.shorteners, &config.supported_protocols) {
                Ok(set) => Some(set),
                Err(e) => {
                    error!(error = %e, "failed to compile extraction patterns, using fallback");
                    None
                }
            }
        } else {
            None
        };

        Self {
            validator: Validator::new(&config),
            config,
            patterns,
            pattern_budget: DEFAULT_PATTERN_BUDGET,
        }
    }

    /// Override the time budget for the enhanced passes.
    pub fn with_pattern_budget(mut self, budget: Duration) -> Self {
        self.pattern_budget = budget;
        self
    }

    /// Extract canonical URLs from `text`, sorted and de-duplicated.
    pub fn extract(&self, text: &str) -> Vec<String> {
        let text = sanitize::truncate_chars(text, self.config.max_input_chars);
        if text.trim().is_empty() {
            return Vec::new();
        }

        let cleaned = sanitize::run_pipeline(text);

        let candidates = match &self.patterns {
            Some(patterns) => match self.collect_candidates(patterns, &cleaned) {
                Ok(candidates) => candidates,
                Err(e) => {
                    error!(error = %e, "enhanced URL extraction failed, falling back");
                    fallback_candidates(&cleaned)
                }
            },
            None => fallback_candidates(&cleaned),
        };

        self.filter_and_validate(candidates)
    }

    /// Extract from raw bytes; invalid UTF-8 sequences are discarded.
    pub fn extract_lossy(&self, bytes: &[u8]) -> Vec<String> {
        self.extract(&String::from_utf8_lossy(bytes))
    }

    /// Resolve a clipboard payload to a URL list.
    ///
    /// Direct links are returned as given (trimmed, de-duplicated). HTML
    /// anchors take precedence over the payload's text.
    pub fn extract_payload(&self, payload: &ClipboardPayload) -> Vec<String> {
        match payload {
            ClipboardPayload::Urls(urls) => {
                let mut seen = BTreeSet::new();
                urls.iter()
                    .map(|u| u.trim())
                    .filter(|u| !u.is_empty() && seen.insert(u.to_string()))
                    .map(String::from)
                    .collect()
            }
            ClipboardPayload::Html { html, text } => {
                let links = html::extract_hrefs(html);
                if !links.is_empty() {
                    debug!(count = links.len(), "using anchor links from HTML payload");
                    return links;
                }
                match text {
                    Some(text) => self.extract(text),
                    None => self.extract(&html::visible_text(html)),
                }
            }
            ClipboardPayload::Text(text) => self.extract(text),
        }
    }

    /// Structural validity of a single candidate.
    pub fn is_valid(&self, candidate: &str) -> bool {
        self.validator.is_valid(candidate)
    }

    /// Canonical form of a single candidate, if it has one.
    pub fn normalize(&self, candidate: &str) -> Option<String> {
        self.validator.normalize(candidate)
    }

    /// Re-normalize an existing (possibly hand-edited) list: sorted, de-duplicated,
    /// entries without a canonical form dropped.
    pub fn organize(&self, urls: &[String]) -> Vec<String> {
        urls.iter()
            .filter_map(|u| self.validator.normalize(u))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Enhanced candidate collection
    // -----------------------------------------------------------------------

    fn collect_candidates(&self, patterns: &PatternSet, cleaned: &str) -> Result<Vec<String>> {
        let started = Instant::now();

        let concatenated =
            concat::split_concatenated(cleaned, |piece| self.validator.is_valid(piece));
        let mut working = cleaned.to_string();
        for span in &concatenated {
            working.replace_range(span.start..span.end, &" ".repeat(span.end - span.start));
        }
        if !concatenated.is_empty() {
            debug!(count = concatenated.len(), "split concatenated URLs");
        }

        let mut spans = SpanSet::default();
        for (kind, re) in patterns.iter() {
            let mut found = 0usize;
            for m in re.find_iter(&working) {
                let kept = spans.offer(CandidateSpan {
                    text: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                    kind,
                });
                if kept {
                    found += 1;
                }
            }
            if found > 0 {
                debug!(pattern = %kind, count = found, "pattern matched");
            }
            if started.elapsed() >= self.pattern_budget {
                return Err(NexusError::parse(format!(
                    "pattern '{kind}' exceeded the {}ms extraction budget",
                    self.pattern_budget.as_millis()
                )));
            }
        }

        let all: BTreeSet<String> = concatenated
            .into_iter()
            .chain(spans.into_spans())
            .map(|span| span.text)
            .collect();

        Ok(self.suppress_substrings(all))
    }

    /// Drop candidates that are proper substrings of a longer, valid candidate
    /// at a URL-structural boundary (exact prefix, or followed by `/`, `?`, `#`).
    fn suppress_substrings(&self, candidates: BTreeSet<String>) -> Vec<String> {
        let mut ordered: Vec<String> = candidates.into_iter().collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut kept: Vec<String> = Vec::with_capacity(ordered.len());
        for candidate in ordered {
            let embedded = kept.iter().any(|longer| {
                longer.len() > candidate.len()
                    && longer.contains(candidate.as_str())
                    && self.validator.is_valid(longer)
                    && embedded_at_boundary(longer, &candidate)
            });
            if embedded {
                debug!(candidate = %candidate, "suppressed embedded candidate");
            } else {
                kept.push(candidate);
            }
        }
        kept
    }

    // -----------------------------------------------------------------------
    // Validation pipeline
    // -----------------------------------------------------------------------

    fn filter_and_validate(&self, candidates: Vec<String>) -> Vec<String> {
        let total = candidates.len();
        let mut valid = BTreeSet::new();
        let mut rejected = 0usize;

        for raw in candidates {
            let candidate = trim_trailing_punct(raw.trim());
            if candidate.is_empty() {
                continue;
            }
            if self.validator.is_probable_filename(candidate) {
                debug!(candidate, "dropped as filename");
                rejected += 1;
                continue;
            }
            if !self.validator.is_valid(candidate) {
                rejected += 1;
                continue;
            }
            match self.validator.normalize(candidate) {
                Some(url) => {
                    valid.insert(url);
                }
                None => rejected += 1,
            }
        }

        if rejected > 0 {
            debug!(rejected, "filtered out invalid URL candidates");
        }
        info!(valid = valid.len(), candidates = total, "extracted URLs");

        valid.into_iter().collect()
    }
}

fn fallback_candidates(cleaned: &str) -> Vec<String> {
    FALLBACK_RE
        .find_iter(cleaned)
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn embedded_at_boundary(longer: &str, candidate: &str) -> bool {
    longer.starts_with(candidate)
        || ['/', '?', '#']
            .iter()
            .any(|sep| longer.contains(&format!("{candidate}{sep}")))
}
