//! Observability for the token validator.
//!
//! Metric definitions and the recorder installed at startup. Logging is
//! plain `tracing`, configured in `main`.

pub mod metrics;
