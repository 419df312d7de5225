//! Health Handlers

use axum::{extract::State, Json};
use chrono::Utc;
use tracing::warn;

use crate::dto::HealthResponse;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        timestamp: Utc::now(),
    })
}

/// GET /health/ready
pub async fn readiness(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state.service.ping().await.map_err(|err| {
        warn!(error = %err, "Readiness check failed");
        ApiError::Unavailable("datastore not ready".to_string())
    })?;

    Ok(Json(HealthResponse {
        status: "ready".to_string(),
        version: state.version.clone(),
        timestamp: Utc::now(),
    }))
}
