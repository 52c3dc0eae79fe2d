use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::config::RedirectMode;
use crate::links::{LinkError, LinkService};

pub struct RedirectState {
    pub links: Arc<LinkService>,
    pub redirect_status: RedirectMode,
}

/// Redirect to the target URL and count the click
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
) -> Response {
    match state.links.resolve(&code).await {
        Ok(link) => {
            tracing::debug!(short_code = %code, clicks = link.clicks, "resolved short link");
            match HeaderValue::try_from(link.target_url.as_str()) {
                Ok(location) => (
                    state.redirect_status.status_code(),
                    [
                        (header::LOCATION, location),
                        (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
                    ],
                )
                    .into_response(),
                Err(err) => {
                    tracing::error!(short_code = %code, error = %err, "stored target URL is not a valid header value");
                    LinkError::Storage(err.into()).into_response()
                }
            }
        }
        Err(err) => err.into_response(),
    }
}
