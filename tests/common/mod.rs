#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Request, Response},
    Router,
};
use ocelot::auth::{AuthService, Identity, IdentityVerifier};
use ocelot::config::*;
use ocelot::storage::{LinkStore, SqliteStorage};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Header naming the caller in tests
pub const TEST_USER_HEADER: &str = "x-test-user";

/// Accepts whatever user id the `x-test-user` header names and counts calls
#[derive(Default)]
pub struct HeaderVerifier {
    pub calls: AtomicUsize,
}

#[async_trait]
impl IdentityVerifier for HeaderVerifier {
    async fn verify(&self, headers: &HeaderMap) -> anyhow::Result<Option<Identity>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(headers
            .get(TEST_USER_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(|user| Identity {
                user_id: user.to_string(),
                email: None,
            }))
    }
}

/// Fails every verification, like an unreachable identity provider
pub struct FailingVerifier;

#[async_trait]
impl IdentityVerifier for FailingVerifier {
    async fn verify(&self, _headers: &HeaderMap) -> anyhow::Result<Option<Identity>> {
        anyhow::bail!("JWKS endpoint unreachable")
    }
}

/// File-backed SQLite so concurrent writers behave like production
pub async fn create_test_storage() -> (TempDir, Arc<dyn LinkStore>) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("ocelot-test.db").display());
    let storage = SqliteStorage::new(&url, 5).await.unwrap();
    storage.init().await.unwrap();
    (dir, Arc::new(storage))
}

pub fn create_test_config() -> Config {
    Config {
        database: DatabaseConfig {
            backend: DatabaseBackend::Sqlite,
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        },
        auth: AuthConfig {
            mode: AuthMode::Oauth,
            local_user_id: "local".to_string(),
            oauth: None,
            sign_in_url: None,
        },
        guard: GuardConfig::default(),
        frontend: FrontendConfig { static_dir: None },
        short_codes: ShortCodeConfig::default(),
        pagination: PaginationConfig {
            cursor_hmac_secret: None,
        },
        redirect_status: RedirectMode::default(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub storage: Arc<dyn LinkStore>,
    pub verifier: Arc<HeaderVerifier>,
    _dir: TempDir,
}

/// Router over a fresh database with an arbitrary verifier
pub async fn create_test_router(
    config: &Config,
    verifier: Arc<dyn IdentityVerifier>,
) -> (TempDir, Arc<dyn LinkStore>, Router) {
    let (dir, storage) = create_test_storage().await;
    let auth = Arc::new(AuthService::with_verifier(AuthMode::Oauth, verifier));
    let router = ocelot::build_app(Arc::clone(&storage), auth, config).unwrap();
    (dir, storage, router)
}

pub async fn create_test_app_with(config: Config) -> TestApp {
    let verifier = Arc::new(HeaderVerifier::default());
    let (dir, storage, router) =
        create_test_router(&config, Arc::clone(&verifier) as Arc<dyn IdentityVerifier>).await;

    TestApp {
        router,
        storage,
        verifier,
        _dir: dir,
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(create_test_config()).await
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(TEST_USER_HEADER, user);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
