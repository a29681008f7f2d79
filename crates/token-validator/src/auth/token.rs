//! Parsed token structure.
//!
//! A `ParsedToken` is the result of the structural stage only: three
//! segments, a header with a supported `alg`, a claims object whose
//! registered time claims (if present) are numbers, and a decodable
//! signature. Nothing here has been verified.

use common::jwt::{TokenSegments, TokenStructureError};
use jsonwebtoken::Algorithm;
use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::fmt;

/// Decoded token header.
///
/// `alg` is typed at decode time (an unknown or `none` algorithm is a
/// structural failure). `kid` is kept as raw JSON because its type is
/// untrusted; [`TokenHeader::key_id`] is the only way to read it.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenHeader {
    alg: Algorithm,

    #[serde(default)]
    kid: Option<Value>,
}

impl TokenHeader {
    /// Create a header directly (used by resolvers under test).
    pub fn new(alg: Algorithm, kid: Option<Value>) -> Self {
        Self { alg, kid }
    }

    /// Signing algorithm the token declares.
    pub fn algorithm(&self) -> Algorithm {
        self.alg
    }

    /// Key ID, when present as a non-empty JSON string.
    pub fn key_id(&self) -> Option<&str> {
        self.kid
            .as_ref()
            .and_then(Value::as_str)
            .filter(|kid| !kid.is_empty())
    }
}

/// Decoded claim set.
///
/// Only the time claims the validator enforces are typed; everything else is
/// retained but never interpreted or logged.
#[derive(Clone, Deserialize)]
pub struct TokenClaims {
    /// Issued-at (Unix epoch seconds).
    #[serde(default, deserialize_with = "numeric_date")]
    pub iat: Option<i64>,

    /// Expiration (Unix epoch seconds).
    #[serde(default, deserialize_with = "numeric_date")]
    pub exp: Option<i64>,

    /// All other claims.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Claim values may identify users; Debug shows only the time claims and
/// the names of the rest.
impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("other", &self.other.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// JWT NumericDate: integer or fractional seconds.
///
/// Fractions round up, so comparing against an integer `now` gives the same
/// answer as comparing the exact value.
fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number: Option<serde_json::Number> = Option::deserialize(deserializer)?;
    number
        .map(|n| {
            n.as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.is_finite())
                        .map(|f| f.ceil() as i64)
                })
                .ok_or_else(|| D::Error::custom("numeric date out of range"))
        })
        .transpose()
}

/// A structurally valid, unverified token.
#[derive(Debug)]
pub struct ParsedToken<'a> {
    segments: TokenSegments<'a>,
    header: TokenHeader,
    claims: TokenClaims,
}

impl<'a> ParsedToken<'a> {
    /// Parse a raw compact token.
    ///
    /// # Errors
    ///
    /// Returns `TokenStructureError` for oversized input, wrong segment count,
    /// bad base64url, non-object JSON, an unsupported `alg`, or time claims
    /// that are not numbers.
    pub fn parse(raw: &'a str) -> Result<Self, TokenStructureError> {
        let segments = TokenSegments::split(raw)?;
        let header: TokenHeader = segments.decode_header()?;
        let claims: TokenClaims = segments.decode_claims()?;
        segments.signature_bytes()?;

        Ok(Self {
            segments,
            header,
            claims,
        })
    }

    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// `header.claims` exactly as received.
    pub fn signing_input(&self) -> &'a str {
        self.segments.signing_input()
    }

    /// Signature segment, still base64url-encoded.
    pub fn signature(&self) -> &'a str {
        self.segments.signature()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::jwt::{encode_segment, Segment};

    fn token(header: &str, claims: &str) -> String {
        format!(
            "{}.{}.{}",
            encode_segment(header.as_bytes()),
            encode_segment(claims.as_bytes()),
            encode_segment(b"signature")
        )
    }

    #[test]
    fn test_parse_well_formed() {
        let raw = token(
            r#"{"alg":"EdDSA","typ":"JWT","kid":"key-1"}"#,
            r#"{"sub":"alice","iat":1700000000,"exp":1700003600}"#,
        );

        let parsed = ParsedToken::parse(&raw).unwrap();

        assert_eq!(parsed.header().algorithm(), Algorithm::EdDSA);
        assert_eq!(parsed.header().key_id(), Some("key-1"));
        assert_eq!(parsed.claims().iat, Some(1_700_000_000));
        assert_eq!(parsed.claims().exp, Some(1_700_003_600));
        assert!(parsed.claims().other.contains_key("sub"));
        assert!(raw.starts_with(parsed.signing_input()));
        assert!(raw.ends_with(parsed.signature()));
    }

    #[test]
    fn test_parse_missing_time_claims_is_structurally_fine() {
        let raw = token(r#"{"alg":"HS256"}"#, r#"{"sub":"alice"}"#);
        let parsed = ParsedToken::parse(&raw).unwrap();

        assert!(parsed.claims().iat.is_none());
        assert!(parsed.claims().exp.is_none());
        assert!(parsed.header().key_id().is_none());
    }

    #[test]
    fn test_parse_fractional_dates_round_up() {
        let raw = token(r#"{"alg":"HS256"}"#, r#"{"iat":1700000000.9,"exp":1700003600.5}"#);
        let parsed = ParsedToken::parse(&raw).unwrap();

        assert_eq!(parsed.claims().iat, Some(1_700_000_001));
        assert_eq!(parsed.claims().exp, Some(1_700_003_601));

        let raw = token(r#"{"alg":"HS256"}"#, r#"{"iat":1,"exp":-0.5}"#);
        assert_eq!(ParsedToken::parse(&raw).unwrap().claims().exp, Some(0));
    }

    #[test]
    fn test_parse_null_exp_is_absent() {
        let raw = token(r#"{"alg":"HS256"}"#, r#"{"iat":1,"exp":null}"#);
        let parsed = ParsedToken::parse(&raw).unwrap();
        assert!(parsed.claims().exp.is_none());
    }

    #[test]
    fn test_parse_string_exp_is_malformed() {
        let raw = token(r#"{"alg":"HS256"}"#, r#"{"iat":1,"exp":"tomorrow"}"#);
        assert_eq!(
            ParsedToken::parse(&raw).unwrap_err(),
            TokenStructureError::Json(Segment::Claims)
        );
    }

    #[test]
    fn test_parse_alg_none_is_malformed() {
        let raw = token(r#"{"alg":"none","kid":"key-1"}"#, r#"{"iat":1,"exp":2}"#);
        assert_eq!(
            ParsedToken::parse(&raw).unwrap_err(),
            TokenStructureError::Json(Segment::Header)
        );
    }

    #[test]
    fn test_parse_missing_alg_is_malformed() {
        let raw = token(r#"{"kid":"key-1"}"#, r#"{"iat":1,"exp":2}"#);
        assert_eq!(
            ParsedToken::parse(&raw).unwrap_err(),
            TokenStructureError::Json(Segment::Header)
        );
    }

    #[test]
    fn test_parse_claims_array_is_malformed() {
        let raw = token(r#"{"alg":"HS256"}"#, "[1,2]");
        assert_eq!(
            ParsedToken::parse(&raw).unwrap_err(),
            TokenStructureError::Json(Segment::Claims)
        );
    }

    #[test]
    fn test_parse_bad_signature_encoding() {
        let raw = token(r#"{"alg":"HS256"}"#, r#"{"iat":1,"exp":2}"#);
        let (prefix, _) = raw.rsplit_once('.').unwrap();
        let raw = format!("{prefix}.not*base64");
        assert_eq!(
            ParsedToken::parse(&raw).unwrap_err(),
            TokenStructureError::Encoding(Segment::Signature)
        );
    }

    #[test]
    fn test_claims_debug_hides_values() {
        let raw = token(
            r#"{"alg":"HS256"}"#,
            r#"{"sub":"secret-user-id","iat":1,"exp":2}"#,
        );
        let parsed = ParsedToken::parse(&raw).unwrap();

        let debug_str = format!("{:?}", parsed.claims());
        assert!(debug_str.contains("sub"));
        assert!(!debug_str.contains("secret-user-id"));
    }
}
