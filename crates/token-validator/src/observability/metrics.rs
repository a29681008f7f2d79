//! Metrics definitions for the token validator.
//!
//! All metrics follow Prometheus naming conventions:
//! - `tv_` prefix for the token validator
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: 6 values (one per `ValidationOutcome` variant)
//! - `method`: 10 values (standard methods plus "OTHER")
//! - `endpoint`: 4 values (known routes plus "/other")
//! - `status`: 3 values (success, error, timeout)
//!
//! Key IDs and claim values are never used as labels.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

use crate::handlers::validate::VALIDATE_PATH;

/// Initialize the Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded. Validation is pure CPU
/// work, so its buckets start in the tens of microseconds.
///
/// # Errors
///
/// Returns error if the Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("tv_http_request".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("tv_token_validation".to_string()),
            &[
                0.000_025, 0.000_050, 0.000_100, 0.000_250, 0.000_500, 0.001, 0.002, 0.005,
                0.010,
            ],
        )
        .map_err(|e| format!("Failed to set token validation buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Validation Metrics
// ============================================================================

/// Record one completed validation.
///
/// Metric: `tv_token_validations_total`, `tv_token_validation_duration_seconds`
/// Labels: `outcome`
pub fn record_token_validation(outcome: &'static str, duration: Duration) {
    histogram!("tv_token_validation_duration_seconds",
        "outcome" => outcome
    )
    .record(duration.as_secs_f64());

    counter!("tv_token_validations_total",
        "outcome" => outcome
    )
    .increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `tv_http_requests_total`, `tv_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status_code` (counter) / `status` (histogram)
///
/// Called by the metrics middleware for every response, including
/// framework-level 404s and timeouts.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_method = normalize_method(method);
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("tv_http_request_duration_seconds",
        "method" => normalized_method,
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("tv_http_requests_total",
        "method" => normalized_method,
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request method onto the standard methods; extension methods
/// collapse to "OTHER".
fn normalize_method(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "HEAD" => "HEAD",
        "POST" => "POST",
        "PUT" => "PUT",
        "DELETE" => "DELETE",
        "CONNECT" => "CONNECT",
        "OPTIONS" => "OPTIONS",
        "TRACE" => "TRACE",
        "PATCH" => "PATCH",
        _ => "OTHER",
    }
}

/// Map a request path onto a fixed set of endpoint labels.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        VALIDATE_PATH => VALIDATE_PATH,
        "/v1/health" => "/v1/health",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}
