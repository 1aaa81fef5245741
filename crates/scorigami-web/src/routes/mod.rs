//! HTTP routes.

mod api;
mod error;

pub use error::ApiError;

use crate::AppState;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/graph-stream", get(api::graph_stream))
        .route("/api/v1/graph", get(api::graph))
        .route("/api/v1/layout", get(api::layout))
        .route("/api/v1/node/:id", get(api::node))
        .route("/api/v1/health", get(api::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
