//! # Token Validator Test Utilities
//!
//! Shared test utilities for the token validator.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed Ed25519 and HMAC keys)
//! - A token builder that can produce valid, expired and deliberately
//!   malformed tokens
//! - Server test harness (TestValidatorServer for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tv_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let keypair = TestKeypair::new(1, "key-1");
//!     let server = TestValidatorServer::spawn(&jwks_json(&[keypair.jwk_json()])).await?;
//!
//!     let token = TestTokenBuilder::new().sign_ed25519(&keypair);
//!     // GET {server.url()}/v1/Validate with "Bearer {token}" -> 204
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
