//! Health Routes
//!
//! Health check endpoints for monitoring and Kubernetes probes.
//!
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (ready to serve traffic)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::HealthResponse;
use crate::api::state::AppState;

/// GET /health/live
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Ready once the offline cache answers.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if check_cache_health(&state) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let cache_ok = check_cache_health(&state);
    let sync = state.sync.status().await;

    // A signed-in session with failed writes is still serving local data
    let status = match (cache_ok, sync.failures) {
        (true, 0) => "healthy",
        (true, _) | (false, 0) => "degraded",
        (false, _) => "unhealthy",
    };

    Json(HealthResponse {
        status: status.to_string(),
        store: state.store.stats().await,
        cache: if cache_ok { "ok" } else { "error" }.to_string(),
        signed_in: sync.signed_in,
        websocket_connections: state.ws_connection_count().await,
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn check_cache_health(state: &AppState) -> bool {
    match state.cache.usage_bytes() {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Local cache health check failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        assert_eq!(liveness().await, StatusCode::OK);
    }
}
