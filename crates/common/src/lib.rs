//! Common utilities shared by the token validator and its test utilities.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for compact JWT segment handling (size limit, splitting, decoding)
pub mod jwt;
