//! Passage token decoding
//!
//! Access tokens issued by Passage are compact JWTs whose `sub` claim is the
//! Passage user id. Tokens are decoded here without signature verification;
//! Passage verifies credentials when it issues the token, and nothing in this
//! crate trusts a token beyond using its subject to look the user up with the
//! same token as bearer.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Decode the payload segment of a compact JWT without verifying it
///
/// # Errors
///
/// Returns an error if:
/// - The JWT format is invalid (not 3 parts separated by dots)
/// - Base64 decoding fails
/// - The payload is not a JSON object
pub fn decode_claims(token: &str) -> Result<Value, String> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid JWT format".to_string());
    }

    let payload_b64 = parts[1];
    let payload_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .or_else(|_| general_purpose::URL_SAFE.decode(payload_b64))
        .or_else(|_| general_purpose::STANDARD.decode(payload_b64))
        .map_err(|_| "Base64 decode failed")?;

    let claims: Value =
        serde_json::from_slice(&payload_bytes).map_err(|_| "JSON parse failed".to_string())?;

    if claims.is_object() {
        Ok(claims)
    } else {
        Err("JWT payload is not an object".to_string())
    }
}

/// Extract the `sub` claim from a token
///
/// Returns `None` for malformed tokens, tokens without a subject, and tokens
/// whose subject is empty or not a string.
#[must_use]
pub fn subject(token: &str) -> Option<String> {
    let claims = decode_claims(token).ok()?;
    claims
        .get("sub")
        .and_then(Value::as_str)
        .filter(|sub| !sub.is_empty())
        .map(ToString::to_string)
}

/// Extract the `exp` claim from a token as a UTC timestamp
#[must_use]
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let claims = decode_claims(token).ok()?;
    let exp = claims.get("exp").and_then(Value::as_i64)?;
    match Utc.timestamp_opt(exp, 0) {
        chrono::LocalResult::Single(dt) => Some(dt),
        _ => None,
    }
}
