//! HTTP request handlers for the token validator.

pub mod health;
pub mod metrics;
pub mod validate;

pub use health::{health_check, HealthResponse};
pub use metrics::metrics_handler;
pub use validate::{authorize, bearer_token, validate_token, VALIDATE_PATH};
