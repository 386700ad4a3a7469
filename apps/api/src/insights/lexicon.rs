//! Insight lexicon — the fixed keyword set that marks a line as worth quoting.

use std::str::FromStr;

/// Built-in insight keywords, lowercase.
pub const DEFAULT_KEYWORDS: [&str; 17] = [
    "important",
    "key",
    "crucial",
    "essential",
    "remember",
    "understand",
    "realize",
    "discover",
    "breakthrough",
    "insight",
    "lesson",
    "wisdom",
    "experience",
    "advice",
    "perspective",
    "meaning",
    "purpose",
];

/// How a keyword occurrence is recognised inside a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Plain substring counting: "key" also counts inside "keys" or "monkey".
    #[default]
    Substring,
    /// Only occurrences not flanked by alphanumeric characters.
    Word,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "substring" => Ok(MatchMode::Substring),
            "word" => Ok(MatchMode::Word),
            other => Err(format!(
                "Unknown match mode '{other}' (expected 'substring' or 'word')"
            )),
        }
    }
}

/// An immutable, lowercase, de-duplicated keyword list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexicon {
    keywords: Vec<String>,
}

impl Lexicon {
    /// Normalises keywords to trimmed lowercase, dropping empties and duplicates.
    /// First-seen order is kept.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalised: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !normalised.contains(&keyword) {
                normalised.push(keyword);
            }
        }
        Self {
            keywords: normalised,
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Total keyword hits in `text`, summed across the whole lexicon.
    pub fn hits(&self, text: &str, mode: MatchMode) -> usize {
        let lowered = text.to_lowercase();
        self.keywords
            .iter()
            .map(|kw| count_occurrences(&lowered, kw, mode))
            .sum()
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS)
    }
}

/// Counts non-overlapping occurrences of `keyword` in an already-lowercased haystack.
pub fn count_occurrences(haystack: &str, keyword: &str, mode: MatchMode) -> usize {
    if keyword.is_empty() {
        return 0;
    }
    match mode {
        MatchMode::Substring => haystack.matches(keyword).count(),
        MatchMode::Word => haystack
            .match_indices(keyword)
            .filter(|(start, matched)| {
                let before = haystack[..*start].chars().next_back();
                let after = haystack[start + matched.len()..].chars().next();
                !before.is_some_and(char::is_alphanumeric)
                    && !after.is_some_and(char::is_alphanumeric)
            })
            .count(),
    }
}
