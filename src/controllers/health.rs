use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::domain::tts::{
    dto::{HealthResponse, ReadinessResponse},
    TtsService, TtsServiceApi,
};

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Ready when at least one configured engine answers its probe
pub async fn health_ready(State(tts_service): State<Arc<TtsService>>) -> impl IntoResponse {
    let engines = tts_service.engine_status().await;
    let ready = engines.iter().any(|e| e.configured && e.healthy);

    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (status, Json(ReadinessResponse { status: label, engines }))
}
