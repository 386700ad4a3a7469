//! Insight Extractor — ranks transcript segments by lexicon hits and returns the
//! best quotable lines with deep links back to the source.
//!
//! Pure and synchronous: no I/O, no shared mutable state. One instance lives in
//! `AppState` behind an `Arc` and is called concurrently from every handler.
//!
//! Algorithm:
//! 1. Trim each segment's text
//! 2. score = Σ(keyword occurrences × keyword_weight)
//! 3. Admit if min_len < chars(text) < max_len AND score > 0
//! 4. Stable sort descending by score (input order breaks ties)
//! 5. Keep the first `top_k`
//! 6. Attach `timestamp` and a deep link built from the truncated start second

use serde::{Deserialize, Serialize};

use crate::insights::lexicon::{Lexicon, MatchMode};

pub const DEFAULT_LINK_TEMPLATE: &str =
    "https://www.youtube.com/watch?v={content_id}&t={seconds}s";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// One timestamped line of source text, as supplied by a transcript source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start_time: f64, // seconds, ≥ 0
}

impl Segment {
    pub fn new(text: impl Into<String>, start_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
        }
    }
}

/// A segment promoted to output, carrying its score and a deep link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredQuote {
    pub text: String,
    pub timestamp: f64,
    pub link: String,
    pub score: u32,
}

impl ScoredQuote {
    /// Placeholder returned in place of real quotes when the source lookup failed.
    /// Keeps the response shape intact for callers.
    pub fn placeholder(message: impl std::fmt::Display) -> Self {
        Self {
            text: format!("Error: {message}"),
            timestamp: 0.0,
            link: String::new(),
            score: 0,
        }
    }
}

/// Tunables for the extractor. `Default` reproduces the production heuristic.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub lexicon: Lexicon,
    pub keyword_weight: u32,
    /// Exclusive lower bound on trimmed text length (characters).
    pub min_len: usize,
    /// Exclusive upper bound on trimmed text length (characters).
    pub max_len: usize,
    pub top_k: usize,
    /// Deep-link template with `{content_id}` and `{seconds}` placeholders.
    pub link_template: String,
    pub match_mode: MatchMode,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            lexicon: Lexicon::default(),
            keyword_weight: 10,
            min_len: 20,
            max_len: 120,
            top_k: 8,
            link_template: DEFAULT_LINK_TEMPLATE.to_string(),
            match_mode: MatchMode::Substring,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extractor
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct InsightExtractor {
    config: ExtractorConfig,
}

impl InsightExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Insight score of a single line. Case-insensitive.
    pub fn score(&self, text: &str) -> u32 {
        let hits = self.config.lexicon.hits(text, self.config.match_mode);
        u32::try_from(hits)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.config.keyword_weight)
    }

    /// Returns at most `top_k` quotes, best first.
    pub fn extract(
        &self,
        segments: &[Segment],
        content_id: &str,
        top_k: usize,
    ) -> Vec<ScoredQuote> {
        if top_k == 0 {
            return Vec::new();
        }

        let mut candidates: Vec<(&Segment, &str, u32)> = segments
            .iter()
            .filter_map(|segment| {
                let text = segment.text.trim();
                let len = text.chars().count();
                if len <= self.config.min_len || len >= self.config.max_len {
                    return None;
                }
                let score = self.score(text);
                (score > 0).then_some((segment, text, score))
            })
            .collect();

        // `sort_by` is stable — equal scores keep transcript order
        candidates.sort_by(|a, b| b.2.cmp(&a.2));
        candidates.truncate(top_k);

        candidates
            .into_iter()
            .map(|(segment, text, score)| ScoredQuote {
                text: text.to_string(),
                timestamp: segment.start_time,
                link: self.link_for(content_id, segment.start_time),
                score,
            })
            .collect()
    }

    /// Fills the link template. Seconds are truncated toward zero, never rounded.
    pub fn link_for(&self, content_id: &str, start_time: f64) -> String {
        let seconds = start_time.max(0.0).trunc() as u64;
        self.config
            .link_template
            .replace("{content_id}", content_id)
            .replace("{seconds}", &seconds.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
