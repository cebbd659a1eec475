//! Verification of the `Stripe-Signature` webhook header.
//!
//! The header has the form `t=1492774577,v1=5257a869...,v0=...`. The signed payload is `"{t}.{raw body}"` and each
//! `v1` entry is the hex-encoded HMAC-SHA256 of that payload, keyed with the endpoint's webhook secret. More than one
//! `v1` entry may be present while a secret is being rolled.
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;

use crate::StripeApiError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";
/// Stripe's own libraries reject events older than five minutes.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Checks that `payload` was signed by Stripe with `secret`, and is recent enough to not be a replay.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: DateTime<Utc>,
) -> Result<(), StripeApiError> {
    if secret.is_empty() {
        return Err(StripeApiError::InvalidSignature("No webhook secret is configured".into()));
    }
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => signatures.push(v.to_string()),
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or_else(|| StripeApiError::InvalidSignature("Missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(StripeApiError::InvalidSignature("No v1 signatures in header".into()));
    }
    if (now.timestamp() - timestamp).abs() > tolerance_secs {
        return Err(StripeApiError::InvalidSignature(format!("Timestamp {timestamp} is outside the tolerance window")));
    }
    let valid = signatures.iter().filter_map(|s| hex::decode(s).ok()).any(|sig| {
        signed_payload_mac(secret, timestamp, payload).map(|mac| mac.verify_slice(&sig).is_ok()).unwrap_or(false)
    });
    if valid {
        trace!("🔐️ Stripe webhook signature verified");
        Ok(())
    } else {
        warn!("🔐️ Stripe webhook signature did not match any v1 signature");
        Err(StripeApiError::InvalidSignature("Signature mismatch".into()))
    }
}

/// Produces a `Stripe-Signature` header value for the payload. Used to build fixtures and for local replay tooling.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, StripeApiError> {
    let mac = signed_payload_mac(secret, timestamp, payload)?;
    Ok(format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes())))
}

fn signed_payload_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, StripeApiError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StripeApiError::InvalidSignature(format!("Invalid webhook secret. {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}
