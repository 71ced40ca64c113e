//! Authentication utilities for the Upbit API
//!
//! Upbit authenticates with a JWT (HS256) carrying the access key, a
//! unique nonce, and, for requests with parameters, a SHA512 hash of the
//! urlencoded query string.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::common::errors::{BotError, Result};
use crate::config::types::ApiCredentials;

type HmacSha256 = Hmac<Sha256>;

static NONCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A process-unique nonce: timestamp nanos plus a monotonic counter
fn nonce() -> String {
    let counter = NONCE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    format!("{nanos}-{counter}")
}

/// SHA512 hash of the urlencoded query string, hex encoded
pub fn query_hash(query: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(query.as_bytes());
    hex::encode(hasher.finalize())
}

/// Build the signed JWT for a request.
///
/// # Arguments
/// * `credentials` - API access/secret key pair
/// * `query` - urlencoded query string, if the request has parameters
pub fn build_jwt(credentials: &ApiCredentials, query: Option<&str>) -> Result<String> {
    let header = BASE64_URL.encode(br#"{"alg":"HS256","typ":"JWT"}"#);

    let payload_json = match query {
        Some(query) => serde_json::json!({
            "access_key": credentials.access_key,
            "nonce": nonce(),
            "query_hash": query_hash(query),
            "query_hash_alg": "SHA512",
        }),
        None => serde_json::json!({
            "access_key": credentials.access_key,
            "nonce": nonce(),
        }),
    };
    let payload = BASE64_URL.encode(serde_json::to_vec(&payload_json)?);

    let message = format!("{header}.{payload}");
    let mut mac = HmacSha256::new_from_slice(credentials.secret_key.as_bytes())
        .map_err(|e| BotError::Authentication(format!("Failed to create HMAC: {e}")))?;
    mac.update(message.as_bytes());
    let signature = BASE64_URL.encode(mac.finalize().into_bytes());

    Ok(format!("{message}.{signature}"))
}

/// `Authorization: Bearer <jwt>` header value for a request
pub fn bearer_token(credentials: &ApiCredentials, query: Option<&str>) -> Result<String> {
    Ok(format!("Bearer {}", build_jwt(credentials, query)?))
}
