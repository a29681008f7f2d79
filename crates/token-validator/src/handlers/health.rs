//! Liveness endpoint.

use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Body of `GET /v1/health`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always "healthy"; the process cannot run without a key set.
    pub status: &'static str,

    /// Number of keys loaded at startup.
    pub key_count: usize,
}

/// Liveness probe handler.
///
/// Reports the loaded key count so operators can confirm which key set a
/// replica started with. Key IDs are not listed.
#[instrument(skip_all, name = "tv.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        key_count: state.key_set.len(),
    })
}
