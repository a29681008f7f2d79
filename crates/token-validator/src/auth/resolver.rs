//! Key resolution: token header to verification key.
//!
//! `KeyResolver` is the seam between token validation and wherever trusted
//! keys live. The production implementation reads an explicitly passed
//! `Arc<KeySet>`; tests substitute instrumented resolvers.
//!
//! No result is cached between calls. Each validation performs a fresh
//! lookup against the snapshot it was given.

use crate::auth::keyset::{KeyFamily, KeyMaterialError, KeySet};
use crate::auth::token::TokenHeader;
use jsonwebtoken::{Algorithm, DecodingKey};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Why a token header could not be turned into a verification key.
///
/// The validator collapses every variant into one outcome; the distinction
/// exists for logging and tests only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// Header has no `kid`, or it is not a non-empty string.
    #[error("token header carries no usable key id")]
    MissingKeyId,

    /// `kid` is not present in the key set.
    #[error("key id not found in key set")]
    KeyNotFound(String),

    /// The stored entry cannot produce verification material.
    #[error("key '{kid}' has unusable key material: {source}")]
    KeyMaterialInvalid {
        kid: String,
        source: KeyMaterialError,
    },
}

/// Verification material for one validation call.
pub struct ResolvedKey {
    /// Key ID the material was found under.
    pub key_id: String,

    /// Algorithm family of the key.
    pub family: KeyFamily,

    /// Exact algorithm the key is pinned to, if any.
    pub algorithm: Option<Algorithm>,

    /// Key usable with `jsonwebtoken::crypto::verify`.
    pub decoding_key: DecodingKey,
}

impl fmt::Debug for ResolvedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedKey")
            .field("key_id", &self.key_id)
            .field("family", &self.family)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Looks up the verification key for a parsed token header.
pub trait KeyResolver: Send + Sync {
    /// Resolve the header's key ID to verification material.
    ///
    /// # Errors
    ///
    /// Returns `ResolutionError` if the header has no usable key ID, the key
    /// is unknown, or its stored material is unusable.
    fn resolve(&self, header: &TokenHeader) -> Result<ResolvedKey, ResolutionError>;
}

/// Resolver backed by an in-memory key set.
#[derive(Debug, Clone)]
pub struct KeySetResolver {
    key_set: Arc<KeySet>,
}

impl KeySetResolver {
    /// Create a resolver over a key-set snapshot.
    pub fn new(key_set: Arc<KeySet>) -> Self {
        Self { key_set }
    }

    /// The key set this resolver reads.
    pub fn key_set(&self) -> &KeySet {
        &self.key_set
    }
}

impl KeyResolver for KeySetResolver {
    #[instrument(skip_all, name = "tv.auth.resolve")]
    fn resolve(&self, header: &TokenHeader) -> Result<ResolvedKey, ResolutionError> {
        let kid = header.key_id().ok_or_else(|| {
            tracing::debug!(target: "tv.auth.resolver", "Token header has no usable kid");
            ResolutionError::MissingKeyId
        })?;

        let key = self.key_set.lookup(kid).ok_or_else(|| {
            tracing::debug!(target: "tv.auth.resolver", kid = %kid, "Key not found in key set");
            ResolutionError::KeyNotFound(kid.to_string())
        })?;

        let decoding_key = key.decoding_key().map_err(|source| {
            tracing::warn!(target: "tv.auth.resolver", kid = %kid, error = %source, "Stored key material is unusable");
            ResolutionError::KeyMaterialInvalid {
                kid: kid.to_string(),
                source,
            }
        })?;

        Ok(ResolvedKey {
            key_id: key.key_id().to_string(),
            family: key.family(),
            algorithm: key.algorithm(),
            decoding_key,
        })
    }
}
