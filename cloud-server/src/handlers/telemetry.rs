//! Telemetry handlers

use axum::{extract::State, Json};
use pitwall_core::logic::dashboard::StatusReport;
use pitwall_core::logic::telemetry::{IngestStatus, TelemetryFrame};
use serde::Deserialize;
use validator::Validate;

use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct TelemetryPayload {
    #[validate(range(min = 0.0, max = 1000.0))]
    pub vibration: f64,
    #[validate(range(min = -50.0, max = 500.0))]
    pub temperature: f64,
    pub aero_load: f64,
    /// Epoch seconds; server time when omitted
    pub timestamp: Option<i64>,
}

/// Overwrite the latest frame
pub async fn ingest(
    State(state): State<AppState>,
    Json(req): Json<TelemetryPayload>,
) -> AppResult<Json<IngestStatus>> {
    req.validate()?;

    let mut frame = TelemetryFrame::now(req.vibration, req.temperature, req.aero_load);
    if let Some(ts) = req.timestamp {
        frame.timestamp = ts;
    }

    match state.pipeline.ingest_telemetry(&frame)? {
        IngestStatus::Rejected { reason } => Err(AppError::ValidationError(reason)),
        accepted => Ok(Json(accepted)),
    }
}

pub async fn latest(State(state): State<AppState>) -> AppResult<Json<Option<TelemetryFrame>>> {
    Ok(Json(state.pipeline.latest_telemetry()?))
}

pub async fn status(State(state): State<AppState>) -> AppResult<Json<StatusReport>> {
    Ok(Json(state.pipeline.status()?))
}
