pub mod health;

use axum::{
    http::Uri,
    routing::{get, post},
    Router,
};

use crate::errors::AppError;
use crate::insights::handlers;
use crate::state::AppState;

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {uri}"))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/health", get(health::health_handler))
        // Landing-page form endpoint
        .route("/analyze", post(handlers::handle_analyze))
        // Insights API
        .route("/api/v1/insights", post(handlers::handle_extract))
        .route(
            "/api/v1/quotes/featured",
            get(handlers::handle_featured_quotes),
        )
        .fallback(not_found)
        .with_state(state)
}
