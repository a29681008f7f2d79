//! Token validation core.
//!
//! Leaves first: `keyset` holds trusted keys, `resolver` maps a token header
//! to one of them, `token` is the structural parse, and `validator` runs the
//! full pipeline.

pub mod keyset;
pub mod resolver;
pub mod token;
pub mod validator;

pub use keyset::{KeyEntryError, KeyFamily, KeySet, KeySetError};
pub use resolver::{KeyResolver, KeySetResolver, ResolutionError, ResolvedKey};
pub use token::{ParsedToken, TokenClaims, TokenHeader};
pub use validator::{TokenValidator, ValidationOutcome};
