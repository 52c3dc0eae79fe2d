use axum::{middleware, routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::{self, handlers::health_check, AppState};
use crate::auth::AuthService;
use crate::config::Config;
use crate::guard::{guard_middleware, AccessGuard};
use crate::links::LinkService;
use crate::redirect;
use crate::storage::LinkStore;

/// Assemble pages, API and redirect routes behind the access guard
pub fn build_app(
    storage: Arc<dyn LinkStore>,
    auth_service: Arc<AuthService>,
    config: &Config,
) -> anyhow::Result<Router> {
    let links = Arc::new(LinkService::new(storage, config.short_codes.clone()));
    let guard = Arc::new(AccessGuard::new(
        &config.guard,
        config.auth.sign_in_url.clone(),
        auth_service,
    )?);

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(api::create_pages_router(config.frontend.clone()))
        .merge(api::create_api_router(Arc::new(AppState {
            links: Arc::clone(&links),
        })))
        .merge(redirect::create_redirect_router(
            links,
            config.redirect_status,
        ))
        .layer(middleware::from_fn_with_state(guard, guard_middleware))
        .layer(TraceLayer::new_for_http());

    Ok(app)
}
