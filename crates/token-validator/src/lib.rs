//! Token Validator Service Library
//!
//! A stateless HTTP service that answers one question: is this bearer token
//! currently valid against a known set of signing keys?
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/validate.rs -> auth::TokenValidator
//!                                              -> auth::KeyResolver -> auth::KeySet
//! ```
//!
//! # Modules
//!
//! - `auth` - Key set, key resolution, token parsing and validation
//! - `config` - Service configuration from environment
//! - `errors` - Request-level errors with HTTP status mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
