use axum::{routing::get, Router};
use std::sync::Arc;

use super::handlers::{redirect_url, RedirectState};

pub fn create_redirect_router(state: Arc<RedirectState>) -> Router {
    Router::new()
        .route("/{code}", get(redirect_url))
        .with_state(state)
}
