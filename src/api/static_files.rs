use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use mime_guess::from_path;
use rust_embed::RustEmbed;
use std::path::{Component, PathBuf};
use std::sync::Arc;

use crate::config::FrontendConfig;

#[derive(RustEmbed)]
#[folder = "frontend"]
pub struct Assets;

const LANDING_PAGE: &str = "index.html";
const DASHBOARD_PAGE: &str = "dashboard.html";

/// Landing page, dashboard shell and `/assets/*`
pub fn create_pages_router(frontend: FrontendConfig) -> Router {
    let static_dir = Arc::new(frontend.static_dir);

    Router::new()
        .route("/", get(landing_page))
        .route("/dashboard", get(dashboard_page))
        .route("/dashboard/{*rest}", get(dashboard_page))
        .route("/assets/{*path}", get(asset))
        .with_state(static_dir)
}

async fn landing_page(State(static_dir): State<Arc<Option<String>>>) -> Response {
    serve_static(LANDING_PAGE, static_dir.as_deref()).await
}

async fn dashboard_page(State(static_dir): State<Arc<Option<String>>>) -> Response {
    serve_static(DASHBOARD_PAGE, static_dir.as_deref()).await
}

async fn asset(
    State(static_dir): State<Arc<Option<String>>>,
    Path(path): Path<String>,
) -> Response {
    serve_static(&format!("assets/{path}"), static_dir.as_deref()).await
}

/// Serve a file from `static_dir` when present there, otherwise from the embedded assets
pub async fn serve_static(path: &str, static_dir: Option<&str>) -> Response {
    if let Some(dir) = static_dir {
        if let Some(file_path) = safe_join(dir, path) {
            if let Ok(content) = tokio::fs::read(&file_path).await {
                return file_response(path, Body::from(content));
            }
        }
    }

    match Assets::get(path) {
        Some(content) => file_response(path, Body::from(content.data)),
        None => (StatusCode::NOT_FOUND, "404 Not Found").into_response(),
    }
}

fn file_response(path: &str, body: Body) -> Response {
    let mime = from_path(path).first_or_octet_stream();
    ([(header::CONTENT_TYPE, mime.as_ref().to_string())], body).into_response()
}

/// Join `path` under `dir`, refusing anything that would escape it
fn safe_join(dir: &str, path: &str) -> Option<PathBuf> {
    let relative = std::path::Path::new(path);
    if relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        Some(PathBuf::from(dir).join(relative))
    } else {
        None
    }
}
