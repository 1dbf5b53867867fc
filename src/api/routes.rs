use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use super::handlers::{create_url, get_stats, get_url, health_check, AppState};

pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/shorten", post(create_url))
        .route("/api/v1/urls/{code}", get(get_url))
        .route("/api/v1/stats/{code}", get(get_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
