use anyhow::{Context, Result};

use crate::insights::extractor::ExtractorConfig;
use crate::insights::lexicon::{Lexicon, MatchMode};

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Preferred transcript languages, most preferred first.
    pub transcript_languages: Vec<String>,
    pub transcript_timeout_secs: u64,
    pub top_k: usize,
    pub match_mode: MatchMode,
    /// Overrides the built-in insight lexicon when set.
    pub keywords: Option<Vec<String>>,
    pub link_template: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            transcript_languages: std::env::var("TRANSCRIPT_LANGUAGES")
                .ok()
                .map(|v| split_list(&v))
                .filter(|langs| !langs.is_empty())
                .unwrap_or_else(|| vec!["en".to_string()]),
            transcript_timeout_secs: parse_env("TRANSCRIPT_TIMEOUT_SECS", 30)?,
            top_k: parse_env("INSIGHT_TOP_K", 8)?,
            match_mode: match std::env::var("INSIGHT_MATCH_MODE") {
                Ok(v) => v.parse().map_err(anyhow::Error::msg)?,
                Err(_) => MatchMode::default(),
            },
            keywords: std::env::var("INSIGHT_KEYWORDS")
                .ok()
                .map(|v| split_list(&v))
                .filter(|kws| !kws.is_empty()),
            link_template: std::env::var("INSIGHT_LINK_TEMPLATE")
                .ok()
                .filter(|t| !t.trim().is_empty()),
        })
    }

    /// Builds the extractor configuration from the loaded settings.
    pub fn extractor_config(&self) -> ExtractorConfig {
        let mut extractor = ExtractorConfig {
            top_k: self.top_k,
            match_mode: self.match_mode,
            ..ExtractorConfig::default()
        };
        if let Some(keywords) = &self.keywords {
            extractor.lexicon = Lexicon::new(keywords);
        }
        if let Some(template) = &self.link_template {
            extractor.link_template = template.clone();
        }
        extractor
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
