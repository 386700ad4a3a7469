mod config;
mod errors;
mod insights;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::insights::extractor::InsightExtractor;
use crate::insights::source::YoutubeTranscriptSource;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Insight API v{}", env!("CARGO_PKG_VERSION"));

    let extractor_config = config.extractor_config();
    info!(
        "Insight extractor: {} keywords, top_k={}, match_mode={:?}",
        extractor_config.lexicon.keywords().len(),
        extractor_config.top_k,
        extractor_config.match_mode
    );
    let extractor = Arc::new(InsightExtractor::new(extractor_config));

    let transcripts = Arc::new(YoutubeTranscriptSource::new(Duration::from_secs(
        config.transcript_timeout_secs,
    ))?);
    info!(
        "Transcript source initialized (languages: {})",
        config.transcript_languages.join(",")
    );

    let state = AppState {
        config: config.clone(),
        extractor,
        transcripts,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
