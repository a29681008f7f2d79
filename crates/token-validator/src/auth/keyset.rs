//! In-memory key set: key ID to verification key.
//!
//! Built once at startup from a JSON Web Key Set document and then only read.
//! Lookups are exact-match `HashMap` accesses; the key ID coming from a token
//! is never used for anything else.
//!
//! # Security
//!
//! - Every entry is bound to an algorithm family derived from its key type
//!   (and curve), so a token can never pick a verification algorithm outside
//!   the family the key was published for
//! - An entry's optional `alg` pins it to exactly one algorithm
//! - Symmetric `k` values are redacted from Debug output
//! - Entries this service cannot verify with (unknown key type, curve or
//!   algorithm, encryption keys) are skipped with a warning
//! - A document that yields no usable signing key is a construction error,
//!   never an empty set

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Ed25519 public key length in bytes.
const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// Errors that make a key-set document unusable.
///
/// All of these are fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeySetError {
    #[error("key set is not a valid JWKS document: {0}")]
    InvalidDocument(String),

    #[error("duplicate key id '{0}'")]
    DuplicateKeyId(String),

    #[error("key set contains no usable signing keys")]
    EmptyKeySet,
}

/// Reasons a single entry is left out of the key set.
///
/// Not fatal: the entry is skipped with a warning and the rest of the
/// document still loads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyEntryError {
    #[error("unsupported key type '{0}'")]
    UnsupportedKeyType(String),

    #[error("unsupported or missing curve '{0}'")]
    UnsupportedCurve(String),

    #[error("unsupported algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("algorithm '{0}' does not match the key type")]
    AlgorithmMismatch(String),
}

/// Errors turning a stored key entry into verification material.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyMaterialError {
    #[error("key parameter '{0}' is missing")]
    MissingParameter(&'static str),

    #[error("key parameter '{0}' is not valid base64url")]
    InvalidEncoding(&'static str),

    #[error("key parameter '{0}' has an invalid length")]
    InvalidLength(&'static str),
}

/// JSON Web Key entry as published in a key-set document.
///
/// Only the parameters needed for signature verification are captured.
#[derive(Clone, Deserialize)]
pub struct Jwk {
    /// Key type: "oct", "RSA", "EC" or "OKP".
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Algorithm the key is restricted to, if any.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" for signing keys).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// Curve name for EC and OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// EC x coordinate or OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Symmetric secret (base64url) - redacted in Debug output.
    #[serde(default)]
    pub k: Option<String>,
}

impl fmt::Debug for Jwk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .field("use", &self.key_use)
            .field("crv", &self.crv)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("n", &self.n)
            .field("e", &self.e)
            .field("k", &self.k.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Key-set document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// Algorithm family a verification key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// Symmetric secret (HS256/HS384/HS512).
    Hmac,
    /// RSA public key (RS* and PS*).
    Rsa,
    /// ECDSA P-256 public key (ES256).
    EcP256,
    /// ECDSA P-384 public key (ES384).
    EcP384,
    /// Ed25519 public key (EdDSA).
    Ed25519,
}

impl KeyFamily {
    /// Whether `alg` is a valid signing algorithm for keys of this family.
    pub fn permits(self, alg: Algorithm) -> bool {
        use Algorithm::*;
        matches!(
            (self, alg),
            (KeyFamily::Hmac, HS256 | HS384 | HS512)
                | (
                    KeyFamily::Rsa,
                    RS256 | RS384 | RS512 | PS256 | PS384 | PS512
                )
                | (KeyFamily::EcP256, ES256)
                | (KeyFamily::EcP384, ES384)
                | (KeyFamily::Ed25519, EdDSA)
        )
    }

    fn of(jwk: &Jwk) -> Result<Self, KeyEntryError> {
        let unsupported_curve =
            || KeyEntryError::UnsupportedCurve(jwk.crv.clone().unwrap_or_default());

        match jwk.kty.as_str() {
            "oct" => Ok(KeyFamily::Hmac),
            "RSA" => Ok(KeyFamily::Rsa),
            "EC" => match jwk.crv.as_deref() {
                Some("P-256") => Ok(KeyFamily::EcP256),
                Some("P-384") => Ok(KeyFamily::EcP384),
                _ => Err(unsupported_curve()),
            },
            "OKP" => match jwk.crv.as_deref() {
                Some("Ed25519") => Ok(KeyFamily::Ed25519),
                _ => Err(unsupported_curve()),
            },
            other => Err(KeyEntryError::UnsupportedKeyType(other.to_string())),
        }
    }
}

/// Derive the family of an entry and the algorithm it is pinned to, if any.
fn classify(jwk: &Jwk) -> Result<(KeyFamily, Option<Algorithm>), KeyEntryError> {
    let family = KeyFamily::of(jwk)?;

    let Some(alg) = jwk.alg.as_deref() else {
        return Ok((family, None));
    };

    let parsed = Algorithm::from_str(alg)
        .map_err(|_| KeyEntryError::UnsupportedAlgorithm(alg.to_string()))?;
    if !family.permits(parsed) {
        return Err(KeyEntryError::AlgorithmMismatch(alg.to_string()));
    }

    Ok((family, Some(parsed)))
}

/// A single trusted verification key.
#[derive(Debug, Clone)]
pub struct VerificationKey {
    kid: String,
    family: KeyFamily,
    algorithm: Option<Algorithm>,
    jwk: Jwk,
}

impl VerificationKey {
    /// Key ID this entry is registered under.
    pub fn key_id(&self) -> &str {
        &self.kid
    }

    /// Algorithm family derived from the key type.
    pub fn family(&self) -> KeyFamily {
        self.family
    }

    /// Algorithm the key is pinned to, when the entry declared one.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// Build the raw verification material for this entry.
    ///
    /// # Errors
    ///
    /// Returns `KeyMaterialError` if a required parameter is missing, is not
    /// base64url, or has the wrong length for the curve.
    pub fn decoding_key(&self) -> Result<DecodingKey, KeyMaterialError> {
        let jwk = &self.jwk;
        match self.family {
            KeyFamily::Hmac => {
                let k = required(jwk.k.as_deref(), "k")?;
                let secret = decode_param(k, "k")?;
                if secret.is_empty() {
                    return Err(KeyMaterialError::InvalidLength("k"));
                }
                Ok(DecodingKey::from_secret(&secret))
            }
            KeyFamily::Rsa => {
                let n = required(jwk.n.as_deref(), "n")?;
                let e = required(jwk.e.as_deref(), "e")?;
                DecodingKey::from_rsa_components(n, e)
                    .map_err(|_| KeyMaterialError::InvalidEncoding("n/e"))
            }
            KeyFamily::EcP256 | KeyFamily::EcP384 => {
                let coordinate_len = if self.family == KeyFamily::EcP256 {
                    32
                } else {
                    48
                };
                let x = required(jwk.x.as_deref(), "x")?;
                let y = required(jwk.y.as_deref(), "y")?;
                check_len(x, "x", coordinate_len)?;
                check_len(y, "y", coordinate_len)?;
                DecodingKey::from_ec_components(x, y)
                    .map_err(|_| KeyMaterialError::InvalidEncoding("x/y"))
            }
            KeyFamily::Ed25519 => {
                let x = required(jwk.x.as_deref(), "x")?;
                check_len(x, "x", ED25519_PUBLIC_KEY_LEN)?;
                DecodingKey::from_ed_components(x)
                    .map_err(|_| KeyMaterialError::InvalidEncoding("x"))
            }
        }
    }
}

fn required<'a>(
    value: Option<&'a str>,
    name: &'static str,
) -> Result<&'a str, KeyMaterialError> {
    value.ok_or(KeyMaterialError::MissingParameter(name))
}

fn decode_param(value: &str, name: &'static str) -> Result<Vec<u8>, KeyMaterialError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| KeyMaterialError::InvalidEncoding(name))
}

fn check_len(value: &str, name: &'static str, expected: usize) -> Result<(), KeyMaterialError> {
    if decode_param(value, name)?.len() != expected {
        return Err(KeyMaterialError::InvalidLength(name));
    }
    Ok(())
}

/// Immutable mapping from key ID to verification key.
#[derive(Debug, Clone)]
pub struct KeySet {
    keys: HashMap<String, VerificationKey>,
}

impl KeySet {
    /// Parse a serialized key-set document.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError` if the document is not a JWKS, a key ID is
    /// duplicated, or no usable signing key remains. Entries with an
    /// unsupported key type, curve or algorithm are skipped.
    pub fn from_json(document: &str) -> Result<Self, KeySetError> {
        let jwks: JwksDocument = serde_json::from_str(document)
            .map_err(|e| KeySetError::InvalidDocument(e.to_string()))?;
        Self::from_jwks(jwks)
    }

    /// Build a key set from an already-deserialized document.
    ///
    /// # Errors
    ///
    /// See [`KeySet::from_json`].
    pub fn from_jwks(jwks: JwksDocument) -> Result<Self, KeySetError> {
        let mut keys = HashMap::with_capacity(jwks.keys.len());
        let mut usable = 0usize;

        for jwk in jwks.keys {
            let Some(kid) = jwk.kid.clone().filter(|kid| !kid.is_empty()) else {
                tracing::warn!(target: "tv.auth.keyset", kty = %jwk.kty, "Skipping key without kid");
                continue;
            };

            if let Some(key_use) = jwk.key_use.as_deref() {
                if key_use != "sig" {
                    tracing::warn!(target: "tv.auth.keyset", kid = %kid, key_use = %key_use, "Skipping non-signing key");
                    continue;
                }
            }

            let (family, algorithm) = match classify(&jwk) {
                Ok(classified) => classified,
                Err(e) => {
                    tracing::warn!(target: "tv.auth.keyset", kid = %kid, kty = %jwk.kty, error = %e, "Skipping unsupported key");
                    continue;
                }
            };

            if keys.contains_key(&kid) {
                return Err(KeySetError::DuplicateKeyId(kid));
            }

            let key = VerificationKey {
                kid: kid.clone(),
                family,
                algorithm,
                jwk,
            };

            match key.decoding_key() {
                Ok(_) => usable += 1,
                Err(e) => {
                    tracing::warn!(target: "tv.auth.keyset", kid = %kid, error = %e, "Key material unusable");
                }
            }

            keys.insert(kid, key);
        }

        if usable == 0 {
            return Err(KeySetError::EmptyKeySet);
        }

        tracing::info!(
            target: "tv.auth.keyset",
            key_count = keys.len(),
            usable_count = usable,
            "Key set loaded"
        );

        Ok(Self { keys })
    }

    /// Exact-match lookup by key ID.
    pub fn lookup(&self, kid: &str) -> Option<&VerificationKey> {
        self.keys.get(kid)
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set is empty. Never true for a set built by `from_jwks`.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key IDs in sorted order.
    pub fn key_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}
