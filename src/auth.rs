//! Request signing for the private REST API.
//!
//! Private calls carry `API-KEY`, `API-TIMESTAMP`, and `API-SIGN`
//! headers, where the signature is an HMAC-SHA256 hex digest over
//! `timestamp + method + path` plus the request body exactly as it is
//! transmitted. The exchange validates the signature against the
//! literal payload, so the signed string and the sent bytes must never
//! diverge.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// API key pair for the private REST and websocket APIs.
#[derive(Clone)]
pub struct Credentials {
    /// Exchange API key, sent verbatim in the `API-KEY` header.
    pub api_key: String,
    /// Exchange API secret, used only as the HMAC key.
    pub api_secret: SecretString,
}

impl Credentials {
    /// Creates credentials from a key/secret pair.
    pub fn new(api_key: impl Into<String>, api_secret: SecretString) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Signs `message` with HMAC-SHA256 and returns a lowercase hex digest.
///
/// HMAC accepts keys of any length, so construction cannot fail.
pub fn sign(secret: &SecretString, message: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Current API timestamp: whole seconds since epoch with a literal
/// `000` suffix.
///
/// The exchange header field is millisecond-shaped but accepts second
/// resolution; the zero padding is part of the accepted format, not a
/// rounding bug.
pub fn api_timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{secs}000")
}

/// Builds the private-call header set for an already-computed signature.
pub fn private_headers(credentials: &Credentials, timestamp: &str, sign: &str) -> Vec<(String, String)> {
    vec![
        ("API-KEY".to_string(), credentials.api_key.clone()),
        ("API-TIMESTAMP".to_string(), timestamp.to_string()),
        ("API-SIGN".to_string(), sign.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{api_timestamp, private_headers, sign, Credentials};

    fn secret() -> SecretString {
        SecretString::new("s3cr3t".to_string())
    }

    #[test]
    fn sign_matches_known_margin_fixture() {
        // HMAC-SHA256(key="s3cr3t", msg="1700000000000GET/v1/account/margin")
        let digest = sign(&secret(), "1700000000000GET/v1/account/margin");
        assert_eq!(
            digest,
            "e67ecc244511523675439cf72edce40a81aa86b5c65fb3d9f8319de18d6decec"
        );
    }

    #[test]
    fn sign_is_deterministic() {
        let message = "1700000000000POST/v1/order{\"symbol\":\"BTC_JPY\"}";
        assert_eq!(sign(&secret(), message), sign(&secret(), message));
    }

    #[test]
    fn sign_changes_when_any_byte_changes() {
        let base = sign(&secret(), "1700000000000GET/v1/account/margin");
        let bumped = sign(&secret(), "1700000000001GET/v1/account/margin");
        assert_ne!(base, bumped);
    }

    #[test]
    fn timestamp_is_seconds_with_zero_millis() {
        let timestamp = api_timestamp();
        assert!(timestamp.ends_with("000"));
        // Seconds-since-epoch stays 10 digits until the year 2286.
        assert_eq!(timestamp.len(), 13);
    }

    #[test]
    fn private_headers_carry_key_timestamp_and_sign() {
        let credentials = Credentials::new("key-1", secret());
        let headers = private_headers(&credentials, "1700000000000", "abc123");
        assert_eq!(
            headers,
            vec![
                ("API-KEY".to_string(), "key-1".to_string()),
                ("API-TIMESTAMP".to_string(), "1700000000000".to_string()),
                ("API-SIGN".to_string(), "abc123".to_string()),
            ]
        );
    }

    #[test]
    fn debug_redacts_the_secret() {
        let rendered = format!("{:?}", Credentials::new("key-1", secret()));
        assert!(rendered.contains("key-1"));
        assert!(!rendered.contains("s3cr3t"));
    }
}
