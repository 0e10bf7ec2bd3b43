//! Liveness probe

use axum::{Router, http::StatusCode, routing::get};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /health - Always OK; does not touch iCloud
async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
