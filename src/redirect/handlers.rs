use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::analytics::{extract_client_ip, ClickJob};
use crate::error::ServiceError;
use crate::queue::JobQueue;
use crate::redirect::Resolver;
use crate::shortener::is_valid_short_code;

pub struct RedirectState {
    pub resolver: Resolver,
    pub queue: Arc<dyn JobQueue>,
}

/// Redirect to the original URL and record the click
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    // Codes the service could never have issued skip the store entirely
    if !is_valid_short_code(&code) {
        return (StatusCode::NOT_FOUND, "URL not found").into_response();
    }

    match state.resolver.resolve(&code).await {
        Ok(url) => {
            let job = build_click_job(&code, &headers, addr);
            let queue = Arc::clone(&state.queue);
            tokio::spawn(async move {
                if let Err(err) = queue.enqueue(job).await {
                    tracing::warn!(short_code = %code, error = %err, "failed to enqueue click job");
                }
            });

            Redirect::permanent(&url.original_url).into_response()
        }
        Err(ServiceError::NotFound) => (StatusCode::NOT_FOUND, "URL not found").into_response(),
        Err(err) => {
            tracing::error!(short_code = %code, error = %err, "redirect resolution failed");
            (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable").into_response()
        }
    }
}

fn build_click_job(code: &str, headers: &HeaderMap, addr: SocketAddr) -> ClickJob {
    let header_str =
        |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok()).map(String::from);

    ClickJob {
        short_code: code.to_string(),
        user_agent: header_str(header::USER_AGENT),
        ip: Some(extract_client_ip(headers, addr.ip()).to_string()),
        referer: header_str(header::REFERER),
        timestamp: chrono::Utc::now().timestamp(),
    }
}
