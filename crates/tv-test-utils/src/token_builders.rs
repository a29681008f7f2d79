//! Test token builder
//!
//! Builds compact JWTs from raw JSON so tests can produce tokens that a
//! well-behaved issuer never would: missing claims, non-string `kid`,
//! mismatched algorithms.

use crate::crypto_fixtures::{TestEcKeypair, TestHmacKey, TestKeypair, TestRsaKeypair};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey};
use serde_json::{json, Map, Value};

/// Default token lifetime in seconds.
pub const DEFAULT_LIFETIME_SECONDS: i64 = 3600;

#[derive(Debug, Clone)]
enum KidSpec {
    /// Use the signing key's own kid.
    FromKey,
    Omit,
    Explicit(Value),
}

/// Builder for signed test tokens.
///
/// # Example
/// ```rust,ignore
/// let keypair = TestKeypair::new(1, "key-1");
/// let expired = TestTokenBuilder::new().expired().sign_ed25519(&keypair);
/// let no_kid = TestTokenBuilder::new().without_kid().sign_ed25519(&keypair);
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    now: i64,
    kid: KidSpec,
    claims: Map<String, Value>,
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestTokenBuilder {
    /// Token issued now, expiring in one hour.
    pub fn new() -> Self {
        Self::at(Utc::now().timestamp())
    }

    /// Token issued at `now`, expiring `DEFAULT_LIFETIME_SECONDS` later.
    pub fn at(now: i64) -> Self {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("test-user"));
        claims.insert("iat".to_string(), json!(now));
        claims.insert("exp".to_string(), json!(now + DEFAULT_LIFETIME_SECONDS));

        Self {
            now,
            kid: KidSpec::FromKey,
            claims,
        }
    }

    /// Override the header `kid`. Any JSON value is allowed.
    pub fn with_kid(mut self, kid: impl Into<Value>) -> Self {
        self.kid = KidSpec::Explicit(kid.into());
        self
    }

    /// Leave `kid` out of the header.
    pub fn without_kid(mut self) -> Self {
        self.kid = KidSpec::Omit;
        self
    }

    pub fn issued_at(self, iat: i64) -> Self {
        self.with_claim("iat", iat)
    }

    pub fn expires_at(self, exp: i64) -> Self {
        self.with_claim("exp", exp)
    }

    /// Expired one second before the builder's `now`.
    pub fn expired(self) -> Self {
        let exp = self.now - 1;
        self.issued_at(exp - DEFAULT_LIFETIME_SECONDS).expires_at(exp)
    }

    pub fn with_claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.claims.insert(name.to_string(), value.into());
        self
    }

    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Sign with EdDSA.
    pub fn sign_ed25519(self, keypair: &TestKeypair) -> String {
        self.sign_with(keypair.kid(), &keypair.encoding_key(), Algorithm::EdDSA)
    }

    /// Sign with an HMAC algorithm.
    pub fn sign_hmac(self, key: &TestHmacKey, alg: Algorithm) -> String {
        self.sign_with(key.kid(), &key.encoding_key(), alg)
    }

    /// Sign with ES256 or ES384, matching the key's curve.
    pub fn sign_ec(self, keypair: &TestEcKeypair, alg: Algorithm) -> String {
        self.sign_with(keypair.kid(), &keypair.encoding_key(), alg)
    }

    /// Sign with an RS* or PS* algorithm.
    pub fn sign_rsa(self, keypair: &TestRsaKeypair, alg: Algorithm) -> String {
        self.sign_with(keypair.kid(), &keypair.encoding_key(), alg)
    }

    /// Sign with an arbitrary key and algorithm; `default_kid` applies unless
    /// the kid was overridden or omitted.
    ///
    /// # Panics
    /// Panics if `jsonwebtoken` cannot sign with the given key/algorithm pair.
    pub fn sign_with(self, default_kid: &str, key: &EncodingKey, alg: Algorithm) -> String {
        let mut header = Map::new();
        header.insert(
            "alg".to_string(),
            serde_json::to_value(alg).expect("algorithm serializes"),
        );
        header.insert("typ".to_string(), json!("JWT"));
        match self.kid {
            KidSpec::FromKey => {
                header.insert("kid".to_string(), json!(default_kid));
            }
            KidSpec::Explicit(kid) => {
                header.insert("kid".to_string(), kid);
            }
            KidSpec::Omit => {}
        }

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(Value::Object(header).to_string()),
            URL_SAFE_NO_PAD.encode(Value::Object(self.claims).to_string())
        );

        let signature = jsonwebtoken::crypto::sign(signing_input.as_bytes(), key, alg)
            .expect("Failed to sign test token");

        format!("{signing_input}.{signature}")
    }
}

/// Corrupt the signature while keeping it valid base64url.
///
/// Replaces the first signature character, whose six bits are all
/// significant, so the result still decodes.
pub fn tamper_signature(token: &str) -> String {
    let (signing_input, signature) = token.rsplit_once('.').expect("token has a signature");
    let mut chars = signature.chars();
    let first = chars.next().expect("signature is not empty");
    let replacement = if first == 'A' { 'B' } else { 'A' };
    format!("{signing_input}.{replacement}{}", chars.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(segment: &str) -> Value {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    fn parts(token: &str) -> (Value, Value) {
        let mut it = token.split('.');
        let header = decode(it.next().unwrap());
        let claims = decode(it.next().unwrap());
        (header, claims)
    }

    #[test]
    fn test_default_token_shape() {
        let keypair = TestKeypair::new(1, "ed-1");
        let token = TestTokenBuilder::at(1000).sign_ed25519(&keypair);

        assert_eq!(token.split('.').count(), 3);
        let (header, claims) = parts(&token);
        assert_eq!(header["alg"], "EdDSA");
        assert_eq!(header["kid"], "ed-1");
        assert_eq!(claims["iat"], 1000);
        assert_eq!(claims["exp"], 1000 + DEFAULT_LIFETIME_SECONDS);
    }

    #[test]
    fn test_kid_overrides() {
        let key = TestHmacKey::new("h-1", b"secret");

        let (header, _) = parts(&TestTokenBuilder::at(0).with_kid(42).sign_hmac(&key, Algorithm::HS256));
        assert_eq!(header["kid"], 42);
        assert_eq!(header["alg"], "HS256");

        let (header, _) = parts(&TestTokenBuilder::at(0).without_kid().sign_hmac(&key, Algorithm::HS384));
        assert!(header.get("kid").is_none());
    }

    #[test]
    fn test_expired_and_removed_claims() {
        let key = TestHmacKey::new("h-1", b"secret");

        let (_, claims) = parts(&TestTokenBuilder::at(500).expired().sign_hmac(&key, Algorithm::HS256));
        assert_eq!(claims["exp"], 499);

        let (_, claims) = parts(
            &TestTokenBuilder::at(500)
                .without_claim("iat")
                .sign_hmac(&key, Algorithm::HS256),
        );
        assert!(claims.get("iat").is_none());
    }

    #[test]
    fn test_tamper_signature_changes_only_signature() {
        let key = TestHmacKey::new("h-1", b"secret");
        let token = TestTokenBuilder::at(0).sign_hmac(&key, Algorithm::HS256);
        let tampered = tamper_signature(&token);

        assert_ne!(token, tampered);
        assert_eq!(token.len(), tampered.len());
        assert_eq!(token.rsplit_once('.').unwrap().0, tampered.rsplit_once('.').unwrap().0);
    }
}
