//! Axum route handlers for the Insights API.

use axum::{extract::State, Form, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::insights::extractor::{InsightExtractor, ScoredQuote, Segment};
use crate::insights::locator::extract_content_id;
use crate::insights::source::SourceError;
use crate::state::AppState;

/// Quotes shown on the landing page.
pub const FEATURED_QUOTES: [&str; 5] = [
    "Your teen is listening, even when they seem to ignore you.",
    "Connection before correction - always.",
    "Their rebellion is often a search for identity.",
    "Listen to understand, not to reply.",
    "Your calm is their anchor in emotional storms.",
];

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    pub youtube_url: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub quotes: Vec<ScoredQuote>,
    pub video_id: String,
}

#[derive(Debug, Deserialize)]
pub struct InsightRequest {
    pub locator: String,
    pub top_k: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct InsightResponse {
    pub quotes: Vec<ScoredQuote>,
    pub content_id: String,
}

#[derive(Debug, Serialize)]
pub struct FeaturedQuotesResponse {
    pub quotes: Vec<&'static str>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /analyze
///
/// Form endpoint used by the landing page. Always answers 200 with a quote list;
/// a failed transcript lookup yields a single error placeholder.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Form(form): Form<AnalyzeForm>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    if form.youtube_url.trim().is_empty() {
        return Err(AppError::Validation("youtube_url cannot be empty".to_string()));
    }

    let video_id = extract_content_id(&form.youtube_url);
    let top_k = state.extractor.config().top_k;
    let quotes = find_quotes(&state, &video_id, top_k).await;

    Ok(Json(AnalyzeResponse { quotes, video_id }))
}

/// POST /api/v1/insights
///
/// JSON variant of `/analyze` with an optional `top_k` override.
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(request): Json<InsightRequest>,
) -> Result<Json<InsightResponse>, AppError> {
    if request.locator.trim().is_empty() {
        return Err(AppError::Validation("locator cannot be empty".to_string()));
    }

    let top_k = match request.top_k {
        None => state.extractor.config().top_k,
        Some(k) => usize::try_from(k)
            .map_err(|_| AppError::Validation(format!("top_k must be >= 0, got {k}")))?,
    };

    let content_id = extract_content_id(&request.locator);
    let quotes = find_quotes(&state, &content_id, top_k).await;

    Ok(Json(InsightResponse { quotes, content_id }))
}

/// GET /api/v1/quotes/featured
pub async fn handle_featured_quotes() -> Json<FeaturedQuotesResponse> {
    Json(FeaturedQuotesResponse {
        quotes: FEATURED_QUOTES.to_vec(),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn find_quotes(state: &AppState, content_id: &str, top_k: usize) -> Vec<ScoredQuote> {
    let fetched = state
        .transcripts
        .fetch(content_id, &state.config.transcript_languages)
        .await;
    quotes_or_placeholder(&state.extractor, fetched, content_id, top_k)
}

/// Converts a transcript lookup into the response quote list.
/// Source failures become a single placeholder quote instead of an HTTP error.
pub fn quotes_or_placeholder(
    extractor: &InsightExtractor,
    fetched: Result<Vec<Segment>, SourceError>,
    content_id: &str,
    top_k: usize,
) -> Vec<ScoredQuote> {
    match fetched {
        Ok(segments) => {
            let quotes = extractor.extract(&segments, content_id, top_k);
            info!(
                "Selected {} of {} segments for {content_id}",
                quotes.len(),
                segments.len()
            );
            quotes
        }
        Err(e) => {
            warn!("Transcript lookup failed for {content_id}: {e}");
            vec![ScoredQuote::placeholder(e)]
        }
    }
}
