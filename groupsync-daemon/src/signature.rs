//! Webhook signature verification.
//!
//! The sender signs `"<timestamp>.<raw body>"` with HMAC-SHA256 under the
//! shared secret and sends `outline-signature: t=<timestamp>,s=<hex digest>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::protocol::SyncStatus;

pub const SIGNATURE_HEADER: &str = "outline-signature";

type HmacSha256 = Hmac<Sha256>;

/// Why a request failed signature verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature header missing")]
    Missing,
    #[error("signature header malformed")]
    Malformed,
    #[error("signature does not match body")]
    Mismatch,
    #[error("webhook secret rejected by HMAC")]
    InvalidKey,
}

impl From<SignatureError> for SyncStatus {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::Missing => SyncStatus::MissingSignature,
            SignatureError::Malformed => SyncStatus::InvalidSignature,
            SignatureError::Mismatch | SignatureError::InvalidKey => SyncStatus::Unauthorized,
        }
    }
}

/// Hex HMAC-SHA256 of `"{timestamp}.{body}"` under `secret`.
pub fn compute_signature(
    secret: &str,
    timestamp: &str,
    body: &[u8],
) -> Result<String, SignatureError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|_| SignatureError::InvalidKey)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// A header value the sender would produce for `body` at `timestamp`.
pub fn signature_header(
    secret: &str,
    timestamp: &str,
    body: &[u8],
) -> Result<String, SignatureError> {
    let signature = compute_signature(secret, timestamp, body)?;
    Ok(format!("t={timestamp},s={signature}"))
}

/// Check `header` (the raw `outline-signature` value, if any) against `body`.
pub fn verify(header: Option<&str>, body: &[u8], secret: &str) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;
    let (timestamp, signature) = parse_header(header)?;
    let expected = compute_signature(secret, timestamp, body)?;
    if bool::from(signature.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

fn parse_header(header: &str) -> Result<(&str, &str), SignatureError> {
    let parts: Vec<&str> = header.split(',').collect();
    let [first, second] = parts.as_slice() else {
        return Err(SignatureError::Malformed);
    };

    let mut timestamp = None;
    let mut signature = None;
    for part in [first, second] {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("s", value)) => signature = Some(value),
            _ => return Err(SignatureError::Malformed),
        }
    }

    match (timestamp, signature) {
        (Some(t), Some(s)) if !t.is_empty() && !s.is_empty() => Ok((t, s)),
        _ => Err(SignatureError::Malformed),
    }
}
