use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::analytics::{StatsAggregator, UrlStats};
use crate::cache::UrlCache;
use crate::error::ServiceError;
use crate::models::{CreateUrlRequest, UrlResponse};
use crate::queue::{JobQueue, QueueCounts};
use crate::shortener::Shortener;
use crate::storage::Storage;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub cache: Arc<dyn UrlCache>,
    pub queue: Arc<dyn JobQueue>,
    pub shortener: Shortener,
    pub stats: StatsAggregator,
    pub public_base_url: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(err: ServiceError) -> (StatusCode, Json<ErrorResponse>) {
    (
        err.status_code(),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

/// Create a new shortened URL
pub async fn create_url(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUrlRequest>,
) -> Result<(StatusCode, Json<UrlResponse>), (StatusCode, Json<ErrorResponse>)> {
    let url = state
        .shortener
        .allocate(&payload.url, payload.custom_alias.as_deref())
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(UrlResponse::from_url(&url, &state.public_base_url)),
    ))
}

/// Get a shortened URL by code
pub async fn get_url(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<UrlResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.storage.get_url(&code).await {
        Ok(Some(url)) => Ok(Json(UrlResponse::from_url(&url, &state.public_base_url))),
        Ok(None) => Err(error_response(ServiceError::NotFound)),
        Err(e) => Err(error_response(ServiceError::Dependency(e.to_string()))),
    }
}

/// Get click statistics for a shortened URL
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<UrlStats>, (StatusCode, Json<ErrorResponse>)> {
    let stats = state.stats.get_stats(&code).await.map_err(error_response)?;
    Ok(Json(stats))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub cache: String,
    pub queue: Option<QueueCounts>,
}

/// Liveness plus dependency visibility. Degraded dependencies are reported
/// in the body; the endpoint itself always answers 200 while the process
/// is serving.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let cache = match state.cache.ping().await {
        Ok(()) => "ok".to_string(),
        Err(err) => {
            tracing::warn!(error = %err, "cache health probe failed");
            "unavailable".to_string()
        }
    };

    let queue = match state.queue.counts().await {
        Ok(counts) => Some(counts),
        Err(err) => {
            tracing::warn!(error = %err, "queue health probe failed");
            None
        }
    };

    Json(HealthResponse {
        status: "OK".to_string(),
        cache,
        queue,
    })
}
