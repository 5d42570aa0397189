use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub storage: String,
    pub supports_delete: bool,
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service is running", body = HealthCheckResponse))
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let storage = state.storage();
    (
        StatusCode::OK,
        Json(HealthCheckResponse {
            status: "healthy".to_string(),
            storage: storage.backend_type().to_string(),
            supports_delete: storage.supports_delete(),
        }),
    )
}
