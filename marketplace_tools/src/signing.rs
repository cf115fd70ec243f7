//! HMAC-SHA256 webhook signing.
//!
//! Verification decodes the supplied signature and hands it to [`Mac::verify_slice`], which compares in
//! constant time. Comparing with `==` would leak how many leading bytes matched through timing.
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, body: &[u8]) -> HmacSha256 {
    // HMAC-SHA256 accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    mac
}

/// The hex encoding of `HMAC-SHA256(secret, body)`.
pub fn hmac_hex(secret: &str, body: &[u8]) -> String {
    hex::encode(mac_for(secret, body).finalize().into_bytes())
}

/// The base64 encoding of `HMAC-SHA256(secret, body)`.
pub fn hmac_base64(secret: &str, body: &[u8]) -> String {
    BASE64.encode(mac_for(secret, body).finalize().into_bytes())
}

/// Checks a hex-encoded signature over the exact raw body bytes.
pub fn verify_hex_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(sig) = hex::decode(signature.trim()) else {
        return false;
    };
    mac_for(secret, body).verify_slice(&sig).is_ok()
}

/// Checks a base64-encoded signature over the exact raw body bytes.
pub fn verify_base64_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(sig) = BASE64.decode(signature.trim()) else {
        return false;
    };
    mac_for(secret, body).verify_slice(&sig).is_ok()
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "super-secret-webhook-key";
    const BODY: &[u8] = br#"{"order":{"id":"R-1001","state":"PENDING"}}"#;

    #[test]
    fn valid_signatures_verify() {
        let hex_sig = hmac_hex(SECRET, BODY);
        assert!(verify_hex_signature(SECRET, BODY, &hex_sig));
        let b64_sig = hmac_base64(SECRET, BODY);
        assert!(verify_base64_signature(SECRET, BODY, &b64_sig));
    }

    #[test]
    fn signature_with_wrong_secret_fails() {
        let sig = hmac_hex("some-other-secret", BODY);
        assert!(!verify_hex_signature(SECRET, BODY, &sig));
    }

    #[test]
    fn signature_over_different_body_fails() {
        let sig = hmac_hex(SECRET, BODY);
        assert!(!verify_hex_signature(SECRET, br#"{"order":{"id":"R-1002"}}"#, &sig));
    }

    #[test]
    fn garbage_signatures_fail_without_panicking() {
        assert!(!verify_hex_signature(SECRET, BODY, "not hex at all"));
        assert!(!verify_hex_signature(SECRET, BODY, ""));
        assert!(!verify_base64_signature(SECRET, BODY, "!!!not base64!!!"));
        // truncated but validly encoded
        let sig = hmac_hex(SECRET, BODY);
        assert!(!verify_hex_signature(SECRET, BODY, &sig[..32]));
    }

    #[test]
    fn whitespace_around_the_header_value_is_tolerated() {
        let sig = hmac_base64(SECRET, BODY);
        assert!(verify_base64_signature(SECRET, BODY, &format!("  {sig}\n")));
    }
}
