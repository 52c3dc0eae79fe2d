//! Request gate that runs before every route.
//!
//! Each request ends in exactly one of three outcomes: it passes through
//! (with the verified [`Identity`] attached when there is one), it is
//! redirected to the authenticated home, or it is rejected as
//! unauthenticated.

pub mod matcher;

use anyhow::Result;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::auth::{AuthService, Identity};
use crate::config::GuardConfig;
use crate::links::LinkError;

pub use matcher::RouteMatcher;

/// File extensions that are served without identity verification
const STATIC_EXTENSIONS: &[&str] = &[
    "html", "htm", "css", "js", "jpg", "jpeg", "webp", "png", "gif", "svg", "ttf", "woff",
    "woff2", "ico", "csv", "doc", "docx", "xls", "xlsx", "zip", "webmanifest", "map", "txt",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    PassThrough,
    Redirect(String),
    Reject,
}

pub struct AccessGuard {
    protected: RouteMatcher,
    public_root: RouteMatcher,
    authenticated_home: String,
    sign_in_url: Option<String>,
    auth: Arc<AuthService>,
}

impl AccessGuard {
    pub fn new(
        config: &GuardConfig,
        sign_in_url: Option<String>,
        auth: Arc<AuthService>,
    ) -> Result<Self> {
        Ok(Self {
            protected: RouteMatcher::new(&config.protected_routes)?,
            public_root: RouteMatcher::new(&config.public_routes)?,
            authenticated_home: config.authenticated_home.clone(),
            sign_in_url,
            auth,
        })
    }

    /// Decide the outcome for `path` given the caller's identity.
    ///
    /// Protected paths win over the public root: a protected path either
    /// passes (identity present) or is rejected. The public root only
    /// redirects callers that are already signed in.
    pub fn decide(&self, path: &str, identity: Option<&Identity>) -> GuardDecision {
        if self.protected.matches(path) {
            return match identity {
                Some(_) => GuardDecision::PassThrough,
                None => GuardDecision::Reject,
            };
        }

        if identity.is_some() && self.public_root.matches(path) {
            return GuardDecision::Redirect(self.authenticated_home.clone());
        }

        GuardDecision::PassThrough
    }

    /// Static assets skip the guard; API routes and protected paths never do.
    pub fn bypasses(&self, path: &str) -> bool {
        if path == "/api" || path.starts_with("/api/") || self.protected.matches(path) {
            return false;
        }
        if path.starts_with("/assets/") {
            return true;
        }

        path.rsplit('/')
            .next()
            .and_then(|segment| segment.rsplit_once('.'))
            .is_some_and(|(_, ext)| {
                STATIC_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    fn reject(&self, path: &str) -> Response {
        let is_api = path == "/api" || path.starts_with("/api/");

        match (&self.sign_in_url, is_api) {
            (Some(sign_in), false) => {
                let target = match url::Url::parse(sign_in) {
                    Ok(mut url) => {
                        url.query_pairs_mut().append_pair("redirect_url", path);
                        url.to_string()
                    }
                    // Relative sign-in paths are used as-is
                    Err(_) => format!(
                        "{}?redirect_url={}",
                        sign_in,
                        url::form_urlencoded::byte_serialize(path.as_bytes()).collect::<String>()
                    ),
                };
                Redirect::to(&target).into_response()
            }
            _ => LinkError::Unauthenticated.into_response(),
        }
    }
}

/// Axum middleware running [`AccessGuard::decide`] for every request
pub async fn guard_middleware(
    State(guard): State<Arc<AccessGuard>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if guard.bypasses(&path) {
        return next.run(request).await;
    }

    let identity = match guard.auth.verify(request.headers()).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!(path = %path, error = %e, "identity verification failed, treating caller as anonymous");
            None
        }
    };

    match guard.decide(&path, identity.as_ref()) {
        GuardDecision::PassThrough => {
            if let Some(identity) = identity {
                request.extensions_mut().insert(identity);
            }
            next.run(request).await
        }
        GuardDecision::Redirect(destination) => {
            debug!(path = %path, destination = %destination, "redirecting signed-in caller");
            let mut response = Redirect::temporary(&destination).into_response();
            response
                .headers_mut()
                .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
            response
        }
        GuardDecision::Reject => {
            debug!(path = %path, "rejecting unauthenticated request");
            guard.reject(&path)
        }
    }
}
