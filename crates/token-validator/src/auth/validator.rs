//! Token validation pipeline.
//!
//! `validate` runs four stages in a fixed order and stops at the first
//! failure:
//!
//! 1. parse: structure, header and claims decoding
//! 2. resolve: header `kid` to a trusted key
//! 3. verify: signature under the declared algorithm, constrained to the
//!    key's family
//! 4. claims: `iat` present, `exp` present and strictly after `now`
//!
//! A token that fails parsing never reaches the resolver, and claim timing
//! is never evaluated for a token whose signature did not verify.

use crate::auth::keyset::KeyFamily;
use crate::auth::resolver::{KeyResolver, ResolvedKey};
use crate::auth::token::{ParsedToken, TokenClaims};
use crate::observability::metrics::record_token_validation;
use jsonwebtoken::Algorithm;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

/// Result of validating one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Malformed,
    KeyNotFound,
    SignatureInvalid,
    /// Names the first required claim found missing.
    ClaimMissing(&'static str),
    ClaimExpired,
}

impl ValidationOutcome {
    pub fn is_valid(self) -> bool {
        self == ValidationOutcome::Valid
    }

    /// Bounded label for metrics and logs.
    pub fn as_label(self) -> &'static str {
        match self {
            ValidationOutcome::Valid => "valid",
            ValidationOutcome::Malformed => "malformed",
            ValidationOutcome::KeyNotFound => "key_not_found",
            ValidationOutcome::SignatureInvalid => "signature_invalid",
            ValidationOutcome::ClaimMissing(_) => "claim_missing",
            ValidationOutcome::ClaimExpired => "claim_expired",
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationOutcome::ClaimMissing(claim) => write!(f, "claim_missing({claim})"),
            other => f.write_str(other.as_label()),
        }
    }
}

/// Why a signature was not accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("algorithm {alg:?} is not valid for a {family:?} key")]
    AlgorithmNotPermitted { alg: Algorithm, family: KeyFamily },

    #[error("key is pinned to {pinned:?} but token declares {alg:?}")]
    AlgorithmPinned { alg: Algorithm, pinned: Algorithm },

    #[error("signature does not match")]
    Mismatch,

    #[error("signature verification failed: {0}")]
    Verification(String),
}

/// Why the mandatory claims were not accepted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimError {
    #[error("required claim '{0}' is missing")]
    Missing(&'static str),

    #[error("token expired at {exp} (now {now})")]
    Expired { exp: i64, now: i64 },
}

/// Validates bearer tokens against keys supplied by a `KeyResolver`.
///
/// Holds no per-request state; clones share the same resolver.
#[derive(Clone)]
pub struct TokenValidator {
    resolver: Arc<dyn KeyResolver>,
}

impl TokenValidator {
    pub fn new(resolver: Arc<dyn KeyResolver>) -> Self {
        Self { resolver }
    }

    /// Validate `raw_token` at time `now` (seconds since the Unix epoch).
    ///
    /// Pure with respect to its inputs: the same `(raw_token, now)` against
    /// the same key set always yields the same outcome.
    #[instrument(skip_all, name = "tv.auth.validate", fields(outcome = tracing::field::Empty))]
    pub fn validate(&self, raw_token: &str, now: i64) -> ValidationOutcome {
        let start = Instant::now();
        let outcome = self.run_stages(raw_token, now);

        tracing::Span::current().record("outcome", outcome.as_label());
        record_token_validation(outcome.as_label(), start.elapsed());

        outcome
    }

    fn run_stages(&self, raw_token: &str, now: i64) -> ValidationOutcome {
        let token = match ParsedToken::parse(raw_token) {
            Ok(token) => token,
            Err(e) => {
                tracing::debug!(target: "tv.auth.validator", stage = "parse", error = %e, "Token rejected");
                return ValidationOutcome::Malformed;
            }
        };

        let key = match self.resolver.resolve(token.header()) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!(target: "tv.auth.validator", stage = "resolve", error = %e, "Token rejected");
                return ValidationOutcome::KeyNotFound;
            }
        };

        if let Err(e) = verify_signature(&token, &key) {
            tracing::debug!(
                target: "tv.auth.validator",
                stage = "verify",
                kid = %key.key_id,
                error = %e,
                "Token rejected"
            );
            return ValidationOutcome::SignatureInvalid;
        }

        match check_claims(token.claims(), now) {
            Ok(()) => ValidationOutcome::Valid,
            Err(e) => {
                tracing::debug!(
                    target: "tv.auth.validator",
                    stage = "claims",
                    kid = %key.key_id,
                    error = %e,
                    "Token rejected"
                );
                match e {
                    ClaimError::Missing(claim) => ValidationOutcome::ClaimMissing(claim),
                    ClaimError::Expired { .. } => ValidationOutcome::ClaimExpired,
                }
            }
        }
    }
}

impl fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenValidator").finish_non_exhaustive()
    }
}

/// Verify the token signature with the resolved key.
///
/// The declared algorithm is checked against the key's family (and pinned
/// algorithm, if any) before any cryptography runs.
///
/// # Errors
///
/// Returns `SignatureError` if the algorithm is not allowed for the key or
/// the signature does not verify.
pub fn verify_signature(token: &ParsedToken<'_>, key: &ResolvedKey) -> Result<(), SignatureError> {
    let alg = token.header().algorithm();

    if !key.family.permits(alg) {
        return Err(SignatureError::AlgorithmNotPermitted {
            alg,
            family: key.family,
        });
    }

    if let Some(pinned) = key.algorithm {
        if pinned != alg {
            return Err(SignatureError::AlgorithmPinned { alg, pinned });
        }
    }

    match jsonwebtoken::crypto::verify(
        token.signature(),
        token.signing_input().as_bytes(),
        &key.decoding_key,
        alg,
    ) {
        Ok(true) => Ok(()),
        Ok(false) => Err(SignatureError::Mismatch),
        Err(e) => Err(SignatureError::Verification(e.to_string())),
    }
}

/// Enforce the mandatory time claims.
///
/// # Errors
///
/// `Missing("iat")`, then `Missing("exp")`, then `Expired` when `exp <= now`.
pub fn check_claims(claims: &TokenClaims, now: i64) -> Result<(), ClaimError> {
    if claims.iat.is_none() {
        return Err(ClaimError::Missing("iat"));
    }

    let exp = claims.exp.ok_or(ClaimError::Missing("exp"))?;
    if exp <= now {
        return Err(ClaimError::Expired { exp, now });
    }

    Ok(())
}
