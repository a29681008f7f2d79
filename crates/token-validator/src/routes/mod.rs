//! HTTP routes for the token validator.
//!
//! Defines the Axum router and application state.

use crate::auth::{KeySet, KeySetResolver, TokenValidator};
use crate::config::{Config, CorsPolicy};
use crate::handlers::{self, VALIDATE_PATH};
use crate::middleware::http_metrics_middleware;
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
        HeaderName, Method,
    },
    middleware,
    routing::{any, get},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Validator bound to the key set below.
    pub validator: TokenValidator,

    /// Key set loaded at startup.
    pub key_set: Arc<KeySet>,

    /// Service configuration.
    pub config: Config,
}

impl AppState {
    /// Wire a validator to the given key-set snapshot.
    pub fn new(key_set: Arc<KeySet>, config: Config) -> Self {
        let resolver = Arc::new(KeySetResolver::new(Arc::clone(&key_set)));
        Self {
            validator: TokenValidator::new(resolver),
            key_set,
            config,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/Validate` - Token validation (all methods reach the handler; only GET is accepted)
/// - `/v1/health` - Liveness probe
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
/// - Configurable request timeout
/// - CORS policy from configuration
/// - HTTP metrics middleware
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let cors = cors_layer(&state.config.cors);
    let timeout = Duration::from_secs(state.config.request_timeout_seconds);

    let app_routes = Router::new()
        .route(VALIDATE_PATH, any(handlers::validate_token))
        .route("/v1/health", get(handlers::health_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (innermost first):
    // 1. TraceLayer (innermost)
    // 2. TimeoutLayer - wraps tracing and the handlers
    // 3. CorsLayer - answers preflights before they reach a handler
    // 4. http_metrics_middleware (outermost)
    app_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(middleware::from_fn(http_metrics_middleware))
}

/// Translate the configured policy into a `CorsLayer`.
pub fn cors_layer(policy: &CorsPolicy) -> CorsLayer {
    match policy {
        CorsPolicy::Permissive => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::HEAD])
            .allow_headers([
                ORIGIN,
                ACCEPT,
                CONTENT_TYPE,
                HeaderName::from_static("x-requested-with"),
            ]),
        CorsPolicy::AllowList(origins) => CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins.iter().cloned()))
            .allow_methods([Method::GET])
            .allow_credentials(true)
            .allow_headers([AUTHORIZATION]),
    }
}
