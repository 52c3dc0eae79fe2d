use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{anyhow, bail, Context, Result};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::OAuthConfig;

type KeyMap = HashMap<String, Arc<DecodingKey>>;

/// Minimum gap between JWKS fetches, successful or not
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Default)]
struct KeyCache {
    keys: KeyMap,
    fetched_at: Option<Instant>,
    last_attempt: Option<Instant>,
}

impl KeyCache {
    fn is_stale(&self, ttl: Duration) -> bool {
        self.fetched_at.map_or(true, |at| at.elapsed() > ttl)
    }

    fn attempted_within(&self, interval: Duration) -> bool {
        self.last_attempt.is_some_and(|at| at.elapsed() < interval)
    }
}

/// Validates session JWTs issued by an OpenID provider against its JWKS
#[derive(Clone)]
pub struct OAuthValidator {
    issuer: String,
    audience: String,
    jwks_uri: String,
    client: Client,
    cache: Arc<RwLock<KeyCache>>,
    cache_ttl: Duration,
    min_refresh_interval: Duration,
}

impl OAuthValidator {
    pub async fn from_config(config: &OAuthConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ocelot-identity/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client for token verification")?;

        let jwks_uri = resolve_jwks_uri(config, &client).await?;
        let validator = Self {
            issuer: config.issuer_url.trim_end_matches('/').to_string(),
            audience: config.audience.clone(),
            jwks_uri,
            client,
            cache: Arc::new(RwLock::new(KeyCache::default())),
            cache_ttl: Duration::from_secs(config.jwks_cache_ttl_secs.max(60)),
            min_refresh_interval: MIN_REFRESH_INTERVAL,
        };

        // Prime the key cache so the first request doesn't pay for the fetch
        validator.refresh_keys().await?;

        Ok(validator)
    }

    /// Verify signature, issuer and audience. Returns the token's claims.
    pub async fn validate(&self, token: &str) -> Result<Value> {
        let header = decode_header(token).context("failed to parse token header")?;
        let kid = header
            .kid
            .ok_or_else(|| anyhow!("token header missing 'kid'"))?;
        if !is_supported_algorithm(header.alg) {
            bail!("token algorithm {:?} is not accepted", header.alg);
        }

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(header.alg);
        validation.validate_aud = false;
        validation.validate_exp = true;

        let claims = decode::<Value>(token, key.as_ref(), &validation)
            .context("token failed signature or structural validation")?
            .claims;

        let issuer = claims
            .get("iss")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("token missing 'iss' claim"))?;
        if issuer.trim_end_matches('/') != self.issuer {
            bail!("token issuer '{}' does not match expected issuer", issuer);
        }

        if !audience_matches(claims.get("aud"), &self.audience) {
            bail!("token audience does not include expected value");
        }

        Ok(claims)
    }

    async fn decoding_key(&self, kid: &str) -> Result<Arc<DecodingKey>> {
        {
            let cache = self.cache.read().await;
            if !cache.is_stale(self.cache_ttl) {
                if let Some(key) = cache.keys.get(kid) {
                    return Ok(Arc::clone(key));
                }
                // Unknown kids must not turn every request into a JWKS fetch
                if cache.attempted_within(self.min_refresh_interval) {
                    bail!("no JWKS entry found for key id '{kid}'");
                }
                debug!("Refreshing JWKS cache because key {kid} was missing");
            } else {
                debug!("Refreshing JWKS cache due to expiration");
            }
        }

        self.refresh_keys().await?;

        self.cache
            .read()
            .await
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| anyhow!("no JWKS entry found for key id '{kid}'"))
    }

    /// Fetch the key set unless another fetch started within the refresh
    /// interval. Holding the write lock makes concurrent callers share one fetch.
    async fn refresh_keys(&self) -> Result<()> {
        let mut cache = self.cache.write().await;
        if cache.attempted_within(self.min_refresh_interval) {
            debug!("Skipping JWKS refresh, last attempt was too recent");
            return Ok(());
        }
        cache.last_attempt = Some(Instant::now());

        let jwks: JwkSet = self
            .client
            .get(&self.jwks_uri)
            .send()
            .await
            .context("failed to request JWKS")?
            .error_for_status()
            .context("JWKS endpoint returned an error status")?
            .json()
            .await
            .context("failed to parse JWKS response")?;

        let keys = build_key_map(jwks)?;

        cache.keys = keys;
        cache.fetched_at = Some(Instant::now());

        Ok(())
    }
}

fn build_key_map(jwks: JwkSet) -> Result<KeyMap> {
    let mut keys = KeyMap::new();

    for jwk in jwks.keys {
        let Some(kid) = jwk.kid else {
            warn!("Skipping JWKS entry without 'kid'");
            continue;
        };

        if jwk.alg.as_deref() == Some("none") {
            warn!("Skipping JWKS entry {kid} with alg 'none'");
            continue;
        }

        match jwk.kty.as_str() {
            "RSA" => {
                let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                    warn!("Skipping RSA key {kid} without modulus or exponent");
                    continue;
                };
                let key = DecodingKey::from_rsa_components(n, e)
                    .context("failed to build RSA decoding key from JWKS entry")?;
                keys.insert(kid, Arc::new(key));
            }
            "EC" => {
                let (Some(x), Some(y)) = (jwk.x.as_deref(), jwk.y.as_deref()) else {
                    warn!("Skipping EC key {kid} without coordinates");
                    continue;
                };
                let key = DecodingKey::from_ec_components(x, y)
                    .context("failed to build EC decoding key from JWKS entry")?;
                keys.insert(kid, Arc::new(key));
            }
            other => {
                warn!("Skipping unsupported JWKS key type: {other}");
            }
        }
    }

    if keys.is_empty() {
        bail!("JWKS response did not contain any usable keys");
    }

    Ok(keys)
}

fn audience_matches(aud_claim: Option<&Value>, expected: &str) -> bool {
    match aud_claim {
        Some(Value::String(aud)) => aud == expected,
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(Value::as_str)
            .any(|entry| entry == expected),
        _ => false,
    }
}

async fn resolve_jwks_uri(config: &OAuthConfig, client: &Client) -> Result<String> {
    if let Some(url) = &config.jwks_url {
        return Ok(url.clone());
    }

    let issuer = config.issuer_url.trim_end_matches('/');
    let discovery_url = format!("{issuer}/.well-known/openid-configuration");
    let metadata: OpenIdProviderMetadata = client
        .get(&discovery_url)
        .send()
        .await
        .context("failed to request OpenID provider metadata")?
        .error_for_status()
        .context("OpenID provider metadata endpoint returned an error status")?
        .json()
        .await
        .context("failed to parse OpenID provider metadata")?;

    metadata
        .jwks_uri
        .ok_or_else(|| anyhow!("OpenID provider metadata did not include 'jwks_uri'"))
}

/// Only asymmetric algorithms are accepted from a remote key set
fn is_supported_algorithm(alg: Algorithm) -> bool {
    matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
            | Algorithm::ES256
            | Algorithm::ES384
    )
}

#[derive(Debug, Deserialize)]
struct OpenIdProviderMetadata {
    jwks_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: Option<String>,
    #[serde(default)]
    kty: String,
    #[serde(default)]
    alg: Option<String>,
    #[serde(default)]
    n: Option<String>,
    #[serde(default)]
    e: Option<String>,
    #[serde(default)]
    x: Option<String>,
    #[serde(default)]
    y: Option<String>,
}
