use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers::{create_link, delete_link, get_link, list_links, update_link, AppState};

/// Owner-scoped link management under `/api/links`
pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/links", post(create_link).get(list_links))
        .route(
            "/api/links/{key}",
            get(get_link).patch(update_link).delete(delete_link),
        )
        .with_state(state)
}
