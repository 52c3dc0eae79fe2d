use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ocelot::auth::AuthService;
use ocelot::config::{AuthMode, Config};
use ocelot::{build_app, cursor, storage};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    info!("Initializing database...");
    let storage = storage::connect(&config.database).await?;
    info!("Database initialized successfully");

    cursor::init_cursor_hmac_key(config.pagination.cursor_hmac_secret.as_deref());
    if config.pagination.cursor_hmac_secret.is_none() {
        info!("CURSOR_HMAC_SECRET not set, pagination cursors will not survive restarts");
    }

    let auth_service = Arc::new(AuthService::new(config.auth.clone()).await?);
    match auth_service.mode() {
        AuthMode::None => {
            info!(
                "🔓 Authentication is disabled - every request acts as '{}'",
                config.auth.local_user_id
            );
        }
        AuthMode::Oauth => {
            if let Some(oauth) = config.auth.oauth.as_ref() {
                info!(
                    "🔐 OAuth authentication enabled (issuer: {}, audience: {})",
                    oauth.issuer_url, oauth.audience
                );
            } else {
                info!("🔐 OAuth authentication enabled");
            }
        }
    }
    info!(
        "🛡  Protected routes: {:?}, signed-in home: {}",
        config.guard.protected_routes, config.guard.authenticated_home
    );

    if let Some(ref static_dir) = config.frontend.static_dir {
        info!("🎨 Serving frontend from directory: {}", static_dir);
    } else {
        info!("🎨 Serving embedded frontend");
    }

    let app = build_app(storage, auth_service, &config)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
