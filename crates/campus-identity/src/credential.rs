//! Cheap, non-authoritative inspection of opaque credentials.
//!
//! Nothing here gates authentication. The backend is the only authority on
//! whether a credential is valid; these helpers feed diagnostics and logs.

use base64::Engine as _;
use chrono::{DateTime, Utc};

use crate::error::StoreError;

const PREVIEW_LEN: usize = 20;

/// Three non-empty dot-separated segments.
#[must_use]
pub fn structurally_plausible(credential: &str) -> bool {
    let mut segments = 0;
    for part in credential.split('.') {
        if part.is_empty() {
            return false;
        }
        segments += 1;
    }
    segments == 3
}

/// Shortened form safe to put in logs: the first 20 characters and `...`.
#[must_use]
pub fn redacted_preview(credential: &str) -> String {
    match credential.char_indices().nth(PREVIEW_LEN) {
        Some((cut, _)) => format!("{}...", &credential[..cut]),
        None => credential.to_string(),
    }
}

/// Best-effort read of a JWT-shaped credential's `exp` claim.
///
/// Does NOT verify anything. A credential this cannot decode is still sent to
/// the backend unchanged.
///
/// # Errors
///
/// Returns `StoreError::Inspect` describing why the payload could not be read.
pub fn decode_expiry(credential: &str) -> Result<DateTime<Utc>, StoreError> {
    let parts: Vec<&str> = credential.split('.').collect();
    if parts.len() != 3 {
        return Err(StoreError::Inspect("credential is not JWT-shaped".into()));
    }
    let payload = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| StoreError::Inspect(format!("base64 decode failed: {e}")))?;
    let value: serde_json::Value = serde_json::from_slice(&payload)
        .map_err(|e| StoreError::Inspect(format!("JSON parse failed: {e}")))?;
    let exp = value["exp"]
        .as_i64()
        .ok_or_else(|| StoreError::Inspect("missing exp claim".into()))?;
    DateTime::from_timestamp(exp, 0)
        .ok_or_else(|| StoreError::Inspect("invalid exp timestamp".into()))
}
