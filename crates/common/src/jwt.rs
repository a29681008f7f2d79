//! Compact JWT segment handling.
//!
//! This module turns an untrusted compact-serialized token
//! (`header.claims.signature`) into its three segments and decodes them.
//! It performs no cryptography and trusts nothing it reads:
//!
//! - Tokens are size-checked BEFORE splitting (DoS prevention)
//! - Each segment must be unpadded base64url
//! - Header and claims must be JSON *objects* (arrays and scalars are rejected
//!   even when they would happen to deserialize into a target struct)
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::TokenSegments;
//!
//! let segments = TokenSegments::split(token)?;
//! let header: MyHeader = segments.decode_header()?;
//! let claims: MyClaims = segments.decode_claims()?;
//! let signature = segments.signature_bytes()?;
//! verify(segments.signing_input(), segments.signature(), ...);
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding or JSON
/// parsing, so an oversized header cannot be used to burn CPU or memory.
///
/// - Typical JWTs are 200-1500 bytes (RSA signatures dominate the upper end)
/// - 8KB leaves room for large claim sets while bounding work per request
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

// =============================================================================
// Error Types
// =============================================================================

/// Which of the three compact segments a structural error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Header,
    Claims,
    Signature,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Segment::Header => "header",
            Segment::Claims => "claims",
            Segment::Signature => "signature",
        };
        f.write_str(name)
    }
}

/// Errors raised while taking a token apart.
///
/// These never reach a caller verbatim; the service collapses all of them
/// into a single "malformed" outcome and logs the detail at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenStructureError {
    /// Token size exceeds `MAX_JWT_SIZE_BYTES`.
    #[error("token exceeds {MAX_JWT_SIZE_BYTES} bytes")]
    TokenTooLarge,

    /// Token does not have exactly three dot-separated segments.
    #[error("token has {0} segments, expected 3")]
    SegmentCount(usize),

    /// Segment is not valid unpadded base64url.
    #[error("{0} segment is not valid base64url")]
    Encoding(Segment),

    /// Segment decoded but is not a JSON object of the expected shape.
    #[error("{0} segment is not a valid JSON object")]
    Json(Segment),
}

// =============================================================================
// Segments
// =============================================================================

/// The three segments of a compact JWT, borrowed from the original string.
#[derive(Debug, Clone, Copy)]
pub struct TokenSegments<'a> {
    token: &'a str,
    header: &'a str,
    claims: &'a str,
    signature: &'a str,
}

impl<'a> TokenSegments<'a> {
    /// Split a token into header, claims and signature segments.
    ///
    /// # Errors
    ///
    /// - `TokenTooLarge` if the token exceeds `MAX_JWT_SIZE_BYTES`
    /// - `SegmentCount` if the token does not have exactly three segments
    pub fn split(token: &'a str) -> Result<Self, TokenStructureError> {
        // Check token size first (DoS prevention)
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "common.jwt",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(TokenStructureError::TokenTooLarge);
        }

        let parts: Vec<&str> = token.split('.').collect();
        match parts.as_slice() {
            [header, claims, signature] => Ok(Self {
                token,
                header,
                claims,
                signature,
            }),
            _ => {
                tracing::debug!(
                    target: "common.jwt",
                    parts = parts.len(),
                    "Token rejected: invalid JWT format"
                );
                Err(TokenStructureError::SegmentCount(parts.len()))
            }
        }
    }

    /// The raw (still encoded) header segment.
    #[must_use]
    pub fn header(&self) -> &'a str {
        self.header
    }

    /// The raw (still encoded) claims segment.
    #[must_use]
    pub fn claims(&self) -> &'a str {
        self.claims
    }

    /// The raw (still encoded) signature segment.
    #[must_use]
    pub fn signature(&self) -> &'a str {
        self.signature
    }

    /// The bytes covered by the signature: `header.claims`, as sent.
    #[must_use]
    pub fn signing_input(&self) -> &'a str {
        let end = self.header.len() + 1 + self.claims.len();
        self.token.get(..end).unwrap_or_default()
    }

    /// Decode the header segment into `T`.
    ///
    /// # Errors
    ///
    /// Returns `Encoding(Header)` or `Json(Header)`.
    pub fn decode_header<T: DeserializeOwned>(&self) -> Result<T, TokenStructureError> {
        decode_object(self.header, Segment::Header)
    }

    /// Decode the claims segment into `T`.
    ///
    /// # Errors
    ///
    /// Returns `Encoding(Claims)` or `Json(Claims)`.
    pub fn decode_claims<T: DeserializeOwned>(&self) -> Result<T, TokenStructureError> {
        decode_object(self.claims, Segment::Claims)
    }

    /// Decode the signature segment to raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `Encoding(Signature)` if the segment is not base64url.
    pub fn signature_bytes(&self) -> Result<Vec<u8>, TokenStructureError> {
        decode_segment(self.signature, Segment::Signature)
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Encode bytes as an unpadded base64url segment.
#[must_use]
pub fn encode_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn decode_segment(segment: &str, which: Segment) -> Result<Vec<u8>, TokenStructureError> {
    URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = %which, error = %e, "Failed to decode JWT segment base64");
        TokenStructureError::Encoding(which)
    })
}

fn decode_object<T: DeserializeOwned>(
    segment: &str,
    which: Segment,
) -> Result<T, TokenStructureError> {
    let bytes = decode_segment(segment, which)?;

    let object: Map<String, Value> = serde_json::from_slice(&bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = %which, error = %e, "Failed to parse JWT segment JSON");
        TokenStructureError::Json(which)
    })?;

    serde_json::from_value(Value::Object(object)).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = %which, error = %e, "JWT segment has unexpected shape");
        TokenStructureError::Json(which)
    })
}

// =============================================================================
// Tests
// =============================================================================
