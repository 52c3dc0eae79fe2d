use axum::{routing::get, Router};
use std::sync::Arc;

use crate::config::RedirectMode;
use crate::links::LinkService;

use super::handlers::{redirect_url, RedirectState};

pub fn create_redirect_router(links: Arc<LinkService>, redirect_status: RedirectMode) -> Router {
    let state = Arc::new(RedirectState {
        links,
        redirect_status,
    });

    Router::new()
        .route("/{code}", get(redirect_url))
        .with_state(state)
}
