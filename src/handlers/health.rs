//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::ml::ModelStatus;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    message: &'static str,
    model_loaded: bool,
    database_connected: bool,
    version: &'static str,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.model.is_loaded();
    let database_connected = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let healthy = model_loaded && database_connected;

    Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" },
        message: if healthy {
            "API operational"
        } else {
            "API running but some dependencies are unavailable"
        },
        model_loaded,
        database_connected,
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Artifact-level model status
pub async fn model_status(State(state): State<AppState>) -> Json<ModelStatus> {
    Json(state.model.status())
}
