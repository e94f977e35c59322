//! Webhook signature verification.
//!
//! LINE signs each webhook delivery with HMAC-SHA256 over the exact raw
//! request body, keyed by the channel secret, and sends the base64-encoded
//! digest in `X-Line-Signature`. Verification must run against the raw bytes
//! before any JSON decoding.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Outcome of checking an inbound request's signature header.
///
/// `Missing` is a distinct trust tier, not a verification failure: whether an
/// unsigned request is accepted is a deployment policy decided by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Invalid,
    Missing,
}

/// Check the signature header of an inbound webhook request.
pub fn check(secret: &str, body: &[u8], provided: Option<&str>) -> SignatureCheck {
    match provided {
        None => SignatureCheck::Missing,
        Some(signature) => {
            if verify(secret, body, signature) {
                SignatureCheck::Valid
            } else {
                SignatureCheck::Invalid
            }
        }
    }
}

/// Verify a base64-encoded HMAC-SHA256 signature over `body`.
///
/// Never panics and never errors: any decode failure or mismatch is `false`.
/// Comparison is constant-time via the HMAC verify primitive.
pub fn verify(secret: &str, body: &[u8], provided: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    let Ok(expected) = BASE64.decode(provided.trim()) else {
        tracing::warn!("webhook signature is not valid base64");
        return false;
    };

    mac.verify_slice(&expected).is_ok()
}

/// Compute the signature value the platform would send for `body`.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}
