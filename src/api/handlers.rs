use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::Identity;
use crate::links::{LinkError, LinkService, NewLink};
use crate::models::{CreateLinkRequest, LinkPage, ShortLink, UpdateLinkRequest};

pub struct AppState {
    pub links: Arc<LinkService>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub cursor: Option<String>,
}

fn default_limit() -> i64 {
    50
}

/// Create a new short link owned by the caller
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    payload: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ShortLink>), LinkError> {
    let Json(payload) = payload?;
    let link = state
        .links
        .create(
            &identity.user_id,
            NewLink {
                url: payload.url,
                short_code: payload.short_code,
                title: payload.title,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(link)))
}

/// List the caller's links, newest first
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<LinkPage>, LinkError> {
    let Query(query) = query?;
    let page = state
        .links
        .list(&identity.user_id, query.limit, query.cursor.as_deref())
        .await?;

    Ok(Json(page))
}

/// Get one of the caller's links by short code
pub async fn get_link(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    code: Result<Path<String>, PathRejection>,
) -> Result<Json<ShortLink>, LinkError> {
    let Path(code) = code?;
    let link = state.links.get_owned(&identity.user_id, &code).await?;
    Ok(Json(link))
}

/// Update url, title or short code of one of the caller's links
pub async fn update_link(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    id: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateLinkRequest>, JsonRejection>,
) -> Result<Json<ShortLink>, LinkError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let link = state.links.update(&identity.user_id, &id, payload).await?;
    Ok(Json(link))
}

/// Delete one of the caller's links
pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    id: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, LinkError> {
    let Path(id) = id?;
    state.links.delete(&identity.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK" })
}
