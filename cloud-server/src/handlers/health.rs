//! Health check handler

use axum::{extract::State, Json};
use pitwall_core::logic::model::EngineStatus;
use pitwall_core::logic::notify::NotifyStats;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: i64,
    scorer: EngineStatus,
    notifications: NotifyStats,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: pitwall_core::constants::APP_NAME,
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        scorer: state.scorer.status(),
        notifications: state.pipeline.notifier().stats(),
    })
}
