pub mod health;

use axum::{routing::get, routing::post, Router};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Match API
        .route("/api/v1/match", post(handlers::handle_match))
        .route("/api/v1/match/batch", post(handlers::handle_match_batch))
        .with_state(state)
}
