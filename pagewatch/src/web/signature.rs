//! Deployment webhook signature verification.
//!
//! The deployment platform signs webhook requests with HMAC-SHA1 over the
//! raw request body, hex encoded, delivered in the `x-vercel-signature`
//! header. Verification must run on the original body bytes: re-serializing
//! a parsed payload is not guaranteed to reproduce them.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use tracing::warn;

type HmacSha1 = Hmac<Sha1>;

/// Verify a deployment webhook signature.
///
/// # Arguments
///
/// * `secret` - The shared webhook signing secret
/// * `body` - Raw request body bytes, captured before any parsing
/// * `signature` - The hex digest supplied in the signature header
///
/// # Returns
///
/// `true` if the signature matches, `false` otherwise.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    if secret.is_empty() || signature.is_empty() {
        warn!(
            has_secret = !secret.is_empty(),
            has_signature = !signature.is_empty(),
            "webhook_signature_missing_fields"
        );
        return false;
    }

    let mut mac = match HmacSha1::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("webhook_signature_invalid_key");
            return false;
        }
    };

    mac.update(body);

    let expected_signature = hex::encode(mac.finalize().into_bytes());

    // Constant-time comparison to prevent timing attacks
    let valid = constant_time_compare(&expected_signature, signature);

    if !valid {
        warn!(
            expected_length = expected_signature.len(),
            actual_length = signature.len(),
            "webhook_signature_mismatch"
        );
    }

    valid
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Check if webhook signature verification is enabled.
pub fn is_signature_verification_enabled(secret: &Option<String>) -> bool {
    secret
        .as_ref()
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_signature_valid() {
        let secret = "test-webhook-secret";
        let body = br#"{"deployment":{"id":"dep123"}}"#;
        let signature = sign(secret, body);

        assert!(verify_webhook_signature(secret, body, &signature));
    }

    #[test]
    fn test_verify_signature_rejects_mutated_body() {
        let secret = "test-webhook-secret";
        let body = br#"{"deployment":{"id":"dep123"}}"#.to_vec();
        let signature = sign(secret, &body);

        for i in 0..body.len() {
            let mut mutated = body.clone();
            mutated[i] ^= 0x01;
            assert!(
                !verify_webhook_signature(secret, &mutated, &signature),
                "mutation at byte {i} should be rejected"
            );
        }
    }

    #[test]
    fn test_verify_signature_rejects_mutated_signature() {
        let secret = "test-webhook-secret";
        let body = br#"{"deployment":{"id":"dep123"}}"#;
        let signature = sign(secret, body);

        for i in 0..signature.len() {
            let mut mutated = signature.clone().into_bytes();
            mutated[i] = if mutated[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(mutated).unwrap();
            assert!(
                !verify_webhook_signature(secret, body, &mutated),
                "mutation at char {i} should be rejected"
            );
        }
    }

    #[test]
    fn test_verify_signature_rejects_wrong_secret() {
        let body = br#"{"deployment":{"id":"dep123"}}"#;
        let signature = sign("secret-a", body);

        assert!(!verify_webhook_signature("secret-b", body, &signature));
    }

    #[test]
    fn test_verify_signature_missing_fields() {
        assert!(!verify_webhook_signature("", b"body", "sig"));
        assert!(!verify_webhook_signature("key", b"body", ""));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_is_signature_verification_enabled() {
        assert!(!is_signature_verification_enabled(&None));
        assert!(!is_signature_verification_enabled(&Some("".to_string())));
        assert!(!is_signature_verification_enabled(&Some("   ".to_string())));
        assert!(is_signature_verification_enabled(&Some(
            "key123".to_string()
        )));
    }
}
