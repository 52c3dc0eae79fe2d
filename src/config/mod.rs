use anyhow::{bail, Context};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub guard: GuardConfig,
    pub frontend: FrontendConfig,
    pub short_codes: ShortCodeConfig,
    pub pagination: PaginationConfig,
    pub redirect_status: RedirectMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    None,
    Oauth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// Identity assigned to every request when `mode` is `none`
    pub local_user_id: String,
    #[serde(default)]
    pub oauth: Option<OAuthConfig>,
    /// Where unauthenticated page requests are sent. `None` answers 401 instead.
    #[serde(default)]
    pub sign_in_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub issuer_url: String,
    pub audience: String,
    #[serde(default)]
    pub jwks_url: Option<String>,
    #[serde(default = "OAuthConfig::default_cache_ttl_secs")]
    pub jwks_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    pub protected_routes: Vec<String>,
    pub public_routes: Vec<String>,
    pub authenticated_home: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfig {
    /// Path to directory containing static frontend files
    /// If None, uses the embedded frontend
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortCodeConfig {
    /// Length of generated codes
    pub length: usize,
    /// Upper bound for caller-chosen codes
    pub max_length: usize,
    /// Generation attempts before giving up on a collision streak
    pub max_attempts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub cursor_hmac_secret: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RedirectMode {
    #[serde(rename = "301")]
    MovedPermanently,
    #[serde(rename = "302")]
    Found,
    #[default]
    #[serde(rename = "307")]
    Temporary,
    #[serde(rename = "308")]
    Permanent,
}

impl RedirectMode {
    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim() {
            "301" => Ok(Self::MovedPermanently),
            "302" => Ok(Self::Found),
            "307" => Ok(Self::Temporary),
            "308" => Ok(Self::Permanent),
            other => bail!("unsupported REDIRECT_STATUS '{other}', expected one of 301, 302, 307, 308"),
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            Self::MovedPermanently => StatusCode::MOVED_PERMANENTLY,
            Self::Found => StatusCode::FOUND,
            Self::Temporary => StatusCode::TEMPORARY_REDIRECT,
            Self::Permanent => StatusCode::PERMANENT_REDIRECT,
        }
    }
}

impl OAuthConfig {
    const fn default_cache_ttl_secs() -> u64 {
        300
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            protected_routes: vec!["/dashboard(.*)".to_string(), "/api/links(.*)".to_string()],
            public_routes: vec!["/".to_string()],
            authenticated_home: "/dashboard".to_string(),
        }
    }
}

impl Default for ShortCodeConfig {
    fn default() -> Self {
        Self {
            length: 7,
            max_length: 32,
            max_attempts: 5,
        }
    }
}

fn env_list(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn env_parse<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./ocelot.db".to_string());
        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS", 10u32)?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_parse("PORT", 3000u16)?;

        let disable_auth = std::env::var("DISABLE_AUTH")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        let mut auth_mode = std::env::var("AUTH_MODE")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase();

        if disable_auth {
            auth_mode = "none".to_string();
        }

        let auth_mode = match auth_mode.as_str() {
            "none" => AuthMode::None,
            "oauth" => AuthMode::Oauth,
            other => {
                tracing::warn!(
                    "Unknown AUTH_MODE '{other}', falling back to 'none'. Supported values: none, oauth"
                );
                AuthMode::None
            }
        };

        let oauth = if matches!(auth_mode, AuthMode::Oauth) {
            let issuer_url = std::env::var("OAUTH_ISSUER_URL")
                .context("OAUTH_ISSUER_URL must be set when AUTH_MODE=oauth")?;
            let audience = std::env::var("OAUTH_AUDIENCE")
                .context("OAUTH_AUDIENCE must be set when AUTH_MODE=oauth")?;
            let jwks_url = std::env::var("OAUTH_JWKS_URL").ok();
            let jwks_cache_ttl_secs = std::env::var("OAUTH_JWKS_CACHE_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or_else(OAuthConfig::default_cache_ttl_secs);

            Some(OAuthConfig {
                issuer_url,
                audience,
                jwks_url,
                jwks_cache_ttl_secs,
            })
        } else {
            None
        };

        let local_user_id =
            std::env::var("LOCAL_USER_ID").unwrap_or_else(|_| "local".to_string());
        let sign_in_url = std::env::var("AUTH_SIGN_IN_URL").ok();

        let guard_defaults = GuardConfig::default();
        let guard = GuardConfig {
            protected_routes: env_list("GUARD_PROTECTED_ROUTES")
                .unwrap_or(guard_defaults.protected_routes),
            public_routes: env_list("GUARD_PUBLIC_ROUTES").unwrap_or(guard_defaults.public_routes),
            authenticated_home: std::env::var("GUARD_AUTHENTICATED_HOME")
                .unwrap_or(guard_defaults.authenticated_home),
        };

        let code_defaults = ShortCodeConfig::default();
        let short_codes = ShortCodeConfig {
            length: env_parse("SHORT_CODE_LENGTH", code_defaults.length)?,
            max_length: env_parse("SHORT_CODE_MAX_LENGTH", code_defaults.max_length)?,
            max_attempts: env_parse("SHORT_CODE_MAX_ATTEMPTS", code_defaults.max_attempts)?,
        };
        if short_codes.length == 0 || short_codes.length > short_codes.max_length {
            bail!(
                "SHORT_CODE_LENGTH must be between 1 and SHORT_CODE_MAX_LENGTH ({})",
                short_codes.max_length
            );
        }
        if short_codes.max_attempts == 0 {
            bail!("SHORT_CODE_MAX_ATTEMPTS must be at least 1");
        }

        let redirect_status = match std::env::var("REDIRECT_STATUS") {
            Ok(raw) => RedirectMode::parse(&raw)?,
            Err(_) => RedirectMode::default(),
        };

        let frontend_static_dir = std::env::var("FRONTEND_STATIC_DIR").ok();
        let cursor_hmac_secret = std::env::var("CURSOR_HMAC_SECRET").ok();

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            server: ServerConfig { host, port },
            auth: AuthConfig {
                mode: auth_mode,
                local_user_id,
                oauth,
                sign_in_url,
            },
            guard,
            frontend: FrontendConfig {
                static_dir: frontend_static_dir,
            },
            short_codes,
            pagination: PaginationConfig { cursor_hmac_secret },
            redirect_status,
        })
    }
}
