use anyhow::{anyhow, Result};
use base64::prelude::*;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::OnceLock;
use subtle::ConstantTimeEq;

use crate::models::ShortLink;

/// Global HMAC key for cursor signing
static HMAC_KEY: OnceLock<Vec<u8>> = OnceLock::new();

fn random_key() -> Vec<u8> {
    use rand::RngExt;
    let mut rng = rand::rng();
    (0..32).map(|_| rng.random::<u8>()).collect()
}

/// Initialize the HMAC key for cursor signing
/// If secret is None, generates a random key (WARNING: cursors won't survive restarts)
pub fn init_cursor_hmac_key(secret: Option<&str>) {
    let key = match secret {
        Some(s) => s.as_bytes().to_vec(),
        None => random_key(),
    };

    if HMAC_KEY.set(key).is_err() {
        tracing::debug!("cursor HMAC key already initialized, keeping the existing key");
    }
}

fn get_hmac_key() -> &'static [u8] {
    HMAC_KEY.get_or_init(random_key)
}

fn sign(payload: &str) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(get_hmac_key())
        .map_err(|e| anyhow!("Failed to create HMAC: {}", e))?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Position of the last row of a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorData {
    pub created_at: i64,
    pub id: String,
}

impl From<&ShortLink> for CursorData {
    fn from(link: &ShortLink) -> Self {
        Self {
            created_at: link.created_at,
            id: link.id.clone(),
        }
    }
}

/// Create a signed cursor: `payload.signature`
pub fn create_cursor(data: &CursorData) -> Result<String> {
    let json = serde_json::to_string(data)?;
    let payload = BASE64_URL_SAFE_NO_PAD.encode(json.as_bytes());
    let signature = BASE64_URL_SAFE_NO_PAD.encode(sign(&payload)?);

    Ok(format!("{}.{}", payload, signature))
}

/// Verify and decode a cursor
pub fn verify_cursor(cursor: &str) -> Result<CursorData> {
    let (payload, signature_b64) = match cursor.split_once('.') {
        Some((p, s)) if !s.contains('.') => (p, s),
        _ => return Err(anyhow!("Invalid cursor format")),
    };

    let expected = sign(payload)?;
    let provided = BASE64_URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| anyhow!("Invalid cursor signature encoding"))?;

    if !bool::from(expected.ct_eq(&provided)) {
        return Err(anyhow!("Cursor signature verification failed"));
    }

    let json_bytes = BASE64_URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| anyhow!("Invalid cursor payload encoding"))?;
    serde_json::from_slice(&json_bytes).map_err(|_| anyhow!("Invalid cursor data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CursorData {
        CursorData {
            created_at: 1_700_000_000_123,
            id: "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11".to_string(),
        }
    }

    #[test]
    fn test_cursor_create_and_verify() {
        init_cursor_hmac_key(Some("test_secret_key_for_hmac_signing"));

        let cursor = create_cursor(&sample()).unwrap();
        assert_eq!(verify_cursor(&cursor).unwrap(), sample());
    }

    #[test]
    fn test_cursor_tampering_detection() {
        init_cursor_hmac_key(Some("test_secret_key_for_hmac_signing"));

        let cursor = create_cursor(&sample()).unwrap();
        let (payload, _) = cursor.split_once('.').unwrap();
        assert!(verify_cursor(&format!("{payload}.invalid_signature")).is_err());

        let forged = BASE64_URL_SAFE_NO_PAD.encode(br#"{"created_at":1,"id":"x"}"#);
        let (_, signature) = cursor.split_once('.').unwrap();
        assert!(verify_cursor(&format!("{forged}.{signature}")).is_err());
    }

    #[test]
    fn test_cursor_invalid_format() {
        assert!(verify_cursor("invalid").is_err());
        assert!(verify_cursor("invalid.format.extra").is_err());
    }
}
