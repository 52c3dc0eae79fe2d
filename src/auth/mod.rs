pub mod oauth;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use serde::Serialize;
use std::sync::Arc;

use crate::config::{AuthConfig, AuthMode};
use crate::links::LinkError;

pub use oauth::OAuthValidator;

/// Name of the session cookie carrying the caller's token
pub const SESSION_COOKIE: &str = "__session";

/// A verified caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

/// Turns request credentials into a verified identity, or `None` when the
/// caller presented nothing usable.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, headers: &HeaderMap) -> Result<Option<Identity>>;
}

/// Treats every caller as the same local user
pub struct LocalVerifier {
    user_id: String,
}

impl LocalVerifier {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for LocalVerifier {
    async fn verify(&self, _headers: &HeaderMap) -> Result<Option<Identity>> {
        Ok(Some(Identity {
            user_id: self.user_id.clone(),
            email: None,
        }))
    }
}

#[async_trait]
impl IdentityVerifier for OAuthValidator {
    async fn verify(&self, headers: &HeaderMap) -> Result<Option<Identity>> {
        let Some(token) = extract_token(headers) else {
            return Ok(None);
        };

        let claims = self.validate(&token).await?;
        let user_id = claims
            .get("sub")
            .and_then(serde_json::Value::as_str)
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| anyhow::anyhow!("token missing 'sub' claim"))?;
        let email = claims
            .get("email")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);

        Ok(Some(Identity {
            user_id: user_id.to_string(),
            email,
        }))
    }
}

/// Selects the verifier for the configured auth mode
pub struct AuthService {
    mode: AuthMode,
    verifier: Arc<dyn IdentityVerifier>,
}

impl AuthService {
    pub async fn new(config: AuthConfig) -> Result<Self> {
        let verifier: Arc<dyn IdentityVerifier> = match config.mode {
            AuthMode::None => Arc::new(LocalVerifier::new(config.local_user_id)),
            AuthMode::Oauth => {
                let oauth = config
                    .oauth
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("OAuth configuration missing"))?;
                Arc::new(OAuthValidator::from_config(oauth).await?)
            }
        };

        Ok(Self {
            mode: config.mode,
            verifier,
        })
    }

    /// Wrap an arbitrary verifier (tests, custom deployments)
    pub fn with_verifier(mode: AuthMode, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { mode, verifier }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub async fn verify(&self, headers: &HeaderMap) -> Result<Option<Identity>> {
        self.verifier.verify(headers).await
    }
}

/// Bearer token from the Authorization header, falling back to the session cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = LinkError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or(LinkError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        headers.insert(header::COOKIE, HeaderValue::from_static("__session=cookie-token"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn session_cookie_is_used_without_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; __session=cookie-token; other=1"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn missing_or_empty_credentials_yield_none() {
        assert_eq!(extract_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        headers.insert(header::COOKIE, HeaderValue::from_static("__session="));
        assert_eq!(extract_token(&headers), None);
    }

    #[tokio::test]
    async fn local_verifier_always_returns_configured_user() {
        let verifier = LocalVerifier::new("local");
        let identity = verifier.verify(&HeaderMap::new()).await.unwrap().unwrap();
        assert_eq!(identity.user_id, "local");
        assert_eq!(identity.email, None);
    }
}
