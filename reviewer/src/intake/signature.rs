//! Webhook signature verification (HMAC-SHA256).
//!
//! Verifies the `x-hub-signature-256` header against the raw request body.
//! The comparison is constant-time (`Mac::verify_slice`), so response timing
//! does not leak how many signature bytes matched. Verification always runs
//! on the raw bytes as delivered, never on re-serialized JSON.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Expected header format: `sha256=` + 64 hex chars.
const SIGNATURE_PREFIX: &str = "sha256=";
const SIGNATURE_HEX_LEN: usize = 64;

/// Returns true iff `signature_header` is a valid HMAC-SHA256 signature of
/// `body` under `secret`.
///
/// Any structural defect (missing prefix, wrong length, non-hex characters)
/// returns false without touching the MAC.
pub fn verify_signature(body: &[u8], secret: &str, signature_header: &str) -> bool {
    let Some(signature_hex) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    if signature_hex.len() != SIGNATURE_HEX_LEN {
        return false;
    }
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Computes the `sha256=<hex>` signature for a body. Used by tests and by
/// local tooling that replays captured deliveries.
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}
