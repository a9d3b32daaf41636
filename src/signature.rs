//! Webhook authentication for the link receiver endpoint.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// How the shared secret authenticates an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretMode {
    /// The header carries the secret itself.
    Plain,
    /// The header carries `sha256=<hex>`, an HMAC-SHA256 digest of the raw
    /// request body keyed by the secret.
    Hmac,
}

/// Constant-time equality comparison for secret strings.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Verify an inbound request against the shared secret.
///
/// Pure function of its inputs. Malformed input (missing header, wrong
/// prefix, bad hex) yields `false`, never an error.
pub fn verify(raw_body: &[u8], header_value: &str, mode: SecretMode, secret: &str) -> bool {
    match mode {
        SecretMode::Plain => constant_time_eq(header_value, secret),
        SecretMode::Hmac => verify_hmac(raw_body, header_value, secret),
    }
}

fn verify_hmac(body: &[u8], signature_header: &str, secret: &str) -> bool {
    // Signature format: "sha256=<hex_signature>"
    let Some(hex_sig) = signature_header.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    // Constant-time comparison
    mac.verify_slice(&expected).is_ok()
}
