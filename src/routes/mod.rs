//! Router assembly: JSON API endpoints, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - daily challenge, story, lookup, history, review, audio, grammar and idiom routes under `/api`
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(http::http_root))
        .route("/api/health", get(http::http_health))
        .route("/api/today", get(http::http_get_today))
        .route("/api/story", post(http::http_post_story))
        .route("/api/lookup", get(http::http_get_lookup))
        .route("/api/history", get(http::http_get_history))
        .route("/api/review-words", get(http::http_get_review_words))
        .route("/api/audio", get(http::http_get_audio))
        .route("/api/grammar", get(http::http_get_grammar))
        .route("/api/idioms/today", get(http::http_get_today_idioms))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}
