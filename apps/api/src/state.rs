use std::sync::Arc;

use crate::config::Config;
use crate::insights::extractor::InsightExtractor;
use crate::insights::source::TranscriptSource;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Stateless; shared across requests without locking.
    pub extractor: Arc<InsightExtractor>,
    /// Pluggable transcript backend. Default: YoutubeTranscriptSource.
    pub transcripts: Arc<dyn TranscriptSource>,
}
